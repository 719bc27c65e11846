use crate::{
    Address,
    H256,
    U256,
    admin::{
        AdminAction,
        AdminActionKind,
    },
    bets::{
        BetSlip,
        PreparedBet,
        preflight,
    },
    chain::{
        ChainError,
        GameReads,
        RaffleReader,
        RpcClient,
        await_confirmation,
    },
    config::{
        AppConfig,
        PreferenceStore,
        RefreshTimings,
        WalletConfig,
    },
    contract::{
        ChainEvent,
        calls,
    },
    directory::{
        Directory,
        HttpDirectory,
    },
    i18n::{
        Language,
        Text,
        tr,
    },
    notify::Notifications,
    refresh::{
        RefreshScope,
        RefreshSources,
        RefreshTrigger,
        WorkerEvent,
        refresh_worker,
    },
    session::{
        CustodialSession,
        KeystoreSession,
        WalletSession,
    },
    snapshot::{
        GameSnapshot,
        SnapshotUpdate,
    },
    subscription::{
        SubscriptionConfig,
        run_subscription,
    },
    transfer::Transfer,
    ui,
    units::{
        format_address,
        format_mon,
        short_address,
    },
    wallets::KeystoreDir,
};
use color_eyre::eyre::{
    Result,
    WrapErr,
    eyre,
};
use std::{
    sync::Arc,
    time::{
        Duration,
        Instant,
    },
};
use tokio::{
    sync::mpsc,
    time,
};
use tracing::{
    error,
    info,
    warn,
};

const GRID_COLUMNS: u8 = 6;

/// A transaction the user has been asked to sign.
#[derive(Clone, Debug, PartialEq, Eq)]
pub enum TxIntent {
    Bet(PreparedBet),
    Withdraw { amount: U256 },
    Admin(AdminAction),
    Transfer(Transfer),
}

impl TxIntent {
    pub fn calldata(&self) -> Vec<u8> {
        match self {
            TxIntent::Bet(prepared) => prepared.calldata.clone(),
            TxIntent::Withdraw { .. } => calls::withdraw_prize(),
            TxIntent::Admin(action) => action.calldata(),
            TxIntent::Transfer(_) => Vec::new(),
        }
    }

    /// Recipient of the transaction; everything but a transfer goes to the
    /// game contract.
    pub fn target(&self, game: Address) -> Address {
        match self {
            TxIntent::Transfer(transfer) => transfer.to,
            _ => game,
        }
    }

    pub fn value(&self) -> U256 {
        match self {
            TxIntent::Bet(prepared) => prepared.value,
            TxIntent::Withdraw { .. } => U256::zero(),
            TxIntent::Admin(action) => action.value(),
            TxIntent::Transfer(transfer) => transfer.amount,
        }
    }

    pub fn describe(&self) -> String {
        match self {
            TxIntent::Bet(prepared) => {
                let mut parts = Vec::new();
                if !prepared.numbers.is_empty() {
                    let numbers: Vec<String> =
                        prepared.numbers.iter().map(|n| format!("{n:02}")).collect();
                    parts.push(numbers.join(" "));
                }
                if !prepared.animals.is_empty() {
                    parts.push(prepared.animals.join(", "));
                }
                format!(
                    "{} bet(s) for {}: {}",
                    prepared.count,
                    format_mon(prepared.value),
                    parts.join(" | ")
                )
            }
            TxIntent::Withdraw { amount } => format!("withdraw {}", format_mon(*amount)),
            TxIntent::Admin(action) => action.describe(),
            TxIntent::Transfer(transfer) => format!(
                "send {} to {}",
                format_mon(transfer.amount),
                format_address(&transfer.to)
            ),
        }
    }

    pub fn is_destructive(&self) -> bool {
        matches!(self, TxIntent::Admin(action) if action.is_destructive())
    }

    fn failure_context(&self) -> &'static str {
        match self {
            TxIntent::Bet(_) => "Bet failed",
            TxIntent::Withdraw { .. } => "Withdraw failed",
            TxIntent::Admin(_) => "Admin action failed",
            TxIntent::Transfer(_) => "Transfer failed",
        }
    }
}

#[derive(Clone, Debug)]
pub struct PendingTx {
    pub intent: TxIntent,
    pub started: Instant,
}

/// Results of work spawned off the UI loop.
#[derive(Debug)]
pub enum Background {
    TxFinished {
        intent: TxIntent,
        result: Result<H256>,
    },
    BetBanner {
        name: String,
        count: u64,
    },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CursorMove {
    Up,
    Down,
    Left,
    Right,
}

/// Borrowed render model for the UI.
pub struct AppView<'a> {
    pub snapshot: &'a GameSnapshot,
    pub slip: &'a BetSlip,
    pub cursor: u8,
    pub notifications: &'a Notifications,
    pub language: Language,
    pub account: Option<Address>,
    pub provider: Option<String>,
    pub pending: Option<&'a PendingTx>,
    pub confirmation: Option<&'a TxIntent>,
    pub status: &'a str,
}

pub struct AppController {
    reads: Arc<dyn GameReads>,
    directory: Arc<dyn Directory>,
    session: Option<Arc<dyn WalletSession>>,
    game: Address,
    timings: RefreshTimings,
    preferences: Option<PreferenceStore>,
    pub snapshot: GameSnapshot,
    pub slip: BetSlip,
    pub cursor: u8,
    pub notifications: Notifications,
    pub language: Language,
    pub status: String,
    pending: Option<PendingTx>,
    awaiting_confirmation: Option<TxIntent>,
}

impl AppController {
    pub fn new(
        reads: Arc<dyn GameReads>,
        directory: Arc<dyn Directory>,
        session: Option<Arc<dyn WalletSession>>,
        game: Address,
        timings: RefreshTimings,
    ) -> Self {
        Self {
            reads,
            directory,
            session,
            game,
            timings,
            preferences: None,
            snapshot: GameSnapshot::default(),
            slip: BetSlip::new(),
            cursor: 0,
            notifications: Notifications::new(timings.notification_ttl, timings.bet_banner_ttl),
            language: Language::default(),
            status: String::from("Ready"),
            pending: None,
            awaiting_confirmation: None,
        }
    }

    pub fn with_preferences(mut self, store: PreferenceStore) -> Self {
        match store.load() {
            Ok(preferences) => self.language = preferences.language,
            Err(e) => warn!(error = %e, "failed to load preferences"),
        }
        self.preferences = Some(store);
        self
    }

    pub fn sources(&self) -> RefreshSources {
        RefreshSources {
            reads: self.reads.clone(),
            directory: self.directory.clone(),
            leaderboard_budget: self.timings.leaderboard,
        }
    }

    pub fn player(&self) -> Option<Address> {
        self.session.as_ref().map(|session| session.address())
    }

    pub fn is_admin(&self) -> bool {
        self.session.is_some() && self.snapshot.is_admin()
    }

    pub fn pending(&self) -> Option<&PendingTx> {
        self.pending.as_ref()
    }

    pub fn awaiting_confirmation(&self) -> Option<&TxIntent> {
        self.awaiting_confirmation.as_ref()
    }

    fn set_status(&mut self, message: impl Into<String>) {
        self.status = message.into();
    }

    pub fn view(&self) -> AppView<'_> {
        AppView {
            snapshot: &self.snapshot,
            slip: &self.slip,
            cursor: self.cursor,
            notifications: &self.notifications,
            language: self.language,
            account: self.player(),
            provider: self.session.as_ref().map(|session| session.provider_label()),
            pending: self.pending.as_ref(),
            confirmation: self.awaiting_confirmation.as_ref(),
            status: &self.status,
        }
    }

    pub fn apply_update(&mut self, update: SnapshotUpdate) {
        self.snapshot = self.snapshot.apply(update);
    }

    /// Resolve the bettor's name off the UI loop and report back a banner.
    pub fn on_chain_event(&self, event: ChainEvent, background: &mpsc::UnboundedSender<Background>) {
        let ChainEvent::BetsPlaced { player, total_bets } = event else {
            return;
        };
        let directory = self.directory.clone();
        let background = background.clone();
        tokio::spawn(async move {
            let name = directory.display_name(player).await;
            let _ = background.send(Background::BetBanner {
                name,
                count: total_bets,
            });
        });
    }

    pub fn move_cursor(&mut self, direction: CursorMove) {
        let column = self.cursor % GRID_COLUMNS;
        self.cursor = match direction {
            CursorMove::Up if self.cursor >= GRID_COLUMNS => self.cursor - GRID_COLUMNS,
            CursorMove::Down if self.cursor + GRID_COLUMNS < crate::animals::SESSION_SIZE => {
                self.cursor + GRID_COLUMNS
            }
            CursorMove::Left if column > 0 => self.cursor - 1,
            CursorMove::Right if column + 1 < GRID_COLUMNS => self.cursor + 1,
            _ => self.cursor,
        };
    }

    pub fn toggle_number_at_cursor(&mut self) {
        self.slip.toggle_number(self.cursor);
    }

    pub fn toggle_animal_at_cursor(&mut self) {
        self.slip
            .toggle_animal(usize::from(self.cursor / GRID_COLUMNS));
    }

    pub fn clear_slip(&mut self) {
        self.slip.clear();
    }

    fn ensure_idle(&self) -> Result<()> {
        if self.pending.is_some() {
            return Err(eyre!("another transaction is still waiting for confirmation"));
        }
        Ok(())
    }

    fn ensure_session(&self) -> Result<()> {
        if self.session.is_none() {
            return Err(ChainError::WalletNotReady.into());
        }
        Ok(())
    }

    /// Run the local checks and stage the bet for confirmation.
    pub fn prepare_bet(&mut self) -> Result<TxIntent> {
        self.ensure_session()?;
        self.ensure_idle()?;
        let context = self
            .snapshot
            .bet_context()
            .ok_or_else(|| eyre!("game state is still loading"))?;
        let prepared = preflight(&self.slip, &context)?;
        let intent = TxIntent::Bet(prepared);
        self.awaiting_confirmation = Some(intent.clone());
        Ok(intent)
    }

    pub fn prepare_withdraw(&mut self) -> Result<TxIntent> {
        self.ensure_session()?;
        self.ensure_idle()?;
        let amount = self
            .snapshot
            .player
            .as_ref()
            .map(|player| player.pending_withdrawal)
            .filter(|amount| !amount.is_zero())
            .ok_or_else(|| eyre!("no prize to withdraw"))?;
        let intent = TxIntent::Withdraw { amount };
        self.awaiting_confirmation = Some(intent.clone());
        Ok(intent)
    }

    /// Stage a value-only transfer out of the game wallet.
    pub fn prepare_transfer(&mut self, to: &str, amount: &str) -> Result<TxIntent> {
        self.ensure_session()?;
        self.ensure_idle()?;
        let from = self.player().ok_or(ChainError::WalletNotReady)?;
        let balance = self
            .snapshot
            .player
            .as_ref()
            .map(|player| player.balance)
            .ok_or_else(|| eyre!("wallet balance is still loading"))?;
        let transfer = Transfer::parse(to, amount, from, balance)?;
        let intent = TxIntent::Transfer(transfer);
        self.awaiting_confirmation = Some(intent.clone());
        Ok(intent)
    }

    pub fn prepare_admin(&mut self, kind: AdminActionKind, input: &str) -> Result<TxIntent> {
        self.ensure_session()?;
        self.ensure_idle()?;
        if !self.is_admin() {
            return Err(eyre!("this wallet is not a game admin"));
        }
        let action = kind.parse(input, self.snapshot.is_paused())?;
        let intent = TxIntent::Admin(action);
        self.awaiting_confirmation = Some(intent.clone());
        Ok(intent)
    }

    /// Answer the signing prompt. Declining counts as a user rejection.
    pub fn confirm(&mut self, approved: bool, background: &mpsc::UnboundedSender<Background>) {
        let Some(intent) = self.awaiting_confirmation.take() else {
            return;
        };
        if !approved {
            let declined = color_eyre::eyre::Report::new(ChainError::UserRejected);
            self.notifications
                .report_failure(intent.failure_context(), &declined);
            self.set_status("Cancelled");
            return;
        }
        if let Err(e) = self.submit(intent.clone(), background) {
            self.notifications.report_failure(intent.failure_context(), &e);
        }
    }

    fn submit(&mut self, intent: TxIntent, background: &mpsc::UnboundedSender<Background>) -> Result<()> {
        self.ensure_idle()?;
        let session = self.session.clone().ok_or(ChainError::WalletNotReady)?;
        let reads = self.reads.clone();
        let game = self.game;
        let poll = self.timings.receipt_poll;
        let background = background.clone();

        info!(action = %intent.describe(), "submitting transaction");
        self.pending = Some(PendingTx {
            intent: intent.clone(),
            started: Instant::now(),
        });
        self.set_status(tr(self.language, Text::Waiting));
        tokio::spawn(async move {
            let result = execute(reads, session, game, &intent, poll).await;
            let _ = background.send(Background::TxFinished { intent, result });
        });
        Ok(())
    }

    /// Fold in spawned work. Returns true when the chain state should be
    /// re-read.
    pub fn on_background(&mut self, message: Background) -> bool {
        match message {
            Background::BetBanner { name, count } => {
                self.notifications.bet_placed(&name, count);
                false
            }
            Background::TxFinished { intent, result } => {
                self.pending = None;
                match result {
                    Ok(hash) => {
                        info!(?hash, action = %intent.describe(), "transaction confirmed");
                        let message = match &intent {
                            TxIntent::Bet(_) => {
                                self.slip.clear();
                                tr(self.language, Text::BetsPlaced).to_string()
                            }
                            TxIntent::Withdraw { .. } => {
                                tr(self.language, Text::PrizeWithdrawn).to_string()
                            }
                            TxIntent::Admin(action) => format!(
                                "{}: {}",
                                tr(self.language, Text::AdminDone),
                                action.describe()
                            ),
                            TxIntent::Transfer(_) => {
                                tr(self.language, Text::TransferSent).to_string()
                            }
                        };
                        self.set_status(message.clone());
                        self.notifications.success(message);
                    }
                    Err(e) => {
                        self.set_status("Ready");
                        self.notifications.report_failure(intent.failure_context(), &e);
                    }
                }
                true
            }
        }
    }

    pub fn toggle_language(&mut self) {
        self.language = self.language.toggled();
        if let Some(store) = &self.preferences
            && let Err(e) = store.set_language(self.language)
        {
            error!(error = %e, "failed to save language preference");
            self.notifications.error(format!("Could not save preference: {e}"));
        }
    }

    /// Drop the wallet session; the client keeps running read-only.
    pub fn logout(&mut self) -> bool {
        if self.pending.is_some() || self.session.is_none() {
            return false;
        }
        if let Some(session) = self.session.take() {
            info!(address = %short_address(&session.address()), "logged out");
        }
        self.awaiting_confirmation = None;
        self.slip.clear();
        self.apply_update(SnapshotUpdate::PlayerCleared);
        true
    }
}

async fn execute(
    reads: Arc<dyn GameReads>,
    session: Arc<dyn WalletSession>,
    game: Address,
    intent: &TxIntent,
    poll: Duration,
) -> Result<H256> {
    if let TxIntent::Bet(prepared) = intent {
        let price = reads
            .bet_price()
            .await
            .wrap_err("failed to re-read bet price")?;
        if price != prepared.price {
            return Err(eyre!(
                "bet price changed from {} to {}",
                format_mon(prepared.price),
                format_mon(price)
            ));
        }
    }
    let hash = session
        .send_transaction(intent.target(game), intent.calldata(), intent.value())
        .await
        .wrap_err("sending transaction failed")?;
    info!(?hash, "transaction sent");
    let receipt = await_confirmation(&*reads, hash, poll)
        .await
        .wrap_err("waiting for confirmation failed")?;
    Ok(receipt.transaction_hash)
}

async fn connect_session(config: &AppConfig) -> Result<Option<Arc<dyn WalletSession>>> {
    match &config.wallet {
        WalletConfig::ReadOnly => Ok(None),
        WalletConfig::Keystore { name, dir } => {
            let keystore = KeystoreDir::new(dir).open(name)?;
            let key = keystore.unlock()?;
            let rpc = Arc::new(RpcClient::new(&config.network.rpc_url)?);
            let session =
                KeystoreSession::connect(keystore.name, key, rpc, config.network.chain_id)
                    .await
                    .wrap_err("failed to open keystore session")?;
            let session: Arc<dyn WalletSession> = Arc::new(session);
            Ok(Some(session))
        }
        WalletConfig::Custodial { signer_url } => {
            let signer = Arc::new(RpcClient::new(signer_url)?);
            let session: Arc<dyn WalletSession> =
                Arc::new(CustodialSession::connect(signer, config.timings.signer_retry).await);
            Ok(Some(session))
        }
    }
}

pub async fn run_app(config: AppConfig) -> Result<()> {
    let rpc = RpcClient::new(&config.network.rpc_url)?;
    let reads: Arc<dyn GameReads> = Arc::new(RaffleReader::new(
        rpc,
        config.network.game,
        config.network.leaderboard,
    ));
    let directory: Arc<dyn Directory> = Arc::new(HttpDirectory::new(
        &config.network.api_url,
        &config.network.game_id,
    )?);
    let session = connect_session(&config).await?;
    let preferences = PreferenceStore::open(&config.preferences_path)?;

    let controller = AppController::new(
        reads,
        directory,
        session,
        config.network.game,
        config.timings,
    )
    .with_preferences(preferences);

    let (trigger_tx, trigger_rx) = mpsc::unbounded_channel();
    let (event_tx, event_rx) = mpsc::unbounded_channel();
    let worker = tokio::spawn(refresh_worker(
        controller.sources(),
        controller.player(),
        config.timings.fast,
        config.timings.slow,
        trigger_rx,
        event_tx,
    ));
    if let Some(ws_url) = &config.network.ws_url {
        tokio::spawn(run_subscription(
            SubscriptionConfig {
                ws_url: ws_url.clone(),
                game: config.network.game,
                leaderboard: config.network.leaderboard,
                reconnect_delay: config.timings.ws_reconnect,
            },
            trigger_tx.clone(),
        ));
    }

    let mut ui_state = ui::UiState::default();
    let mut input_events = ui::input_event_stream();
    info!("Starting UI");
    ui::terminal_enter(&mut ui_state)?;
    let res = run_loop(
        controller,
        &mut ui_state,
        &mut input_events,
        trigger_tx,
        event_rx,
        worker,
    )
    .await;
    ui::terminal_exit()?;
    res
}

fn redraw(ui_state: &mut ui::UiState, controller: &AppController, context: &'static str) -> Result<()> {
    ui::draw(ui_state, &controller.view()).wrap_err(context)
}

async fn run_loop(
    mut controller: AppController,
    ui_state: &mut ui::UiState,
    input_events: &mut ui::InputEventReceiver,
    trigger_tx: mpsc::UnboundedSender<RefreshTrigger>,
    mut event_rx: mpsc::UnboundedReceiver<WorkerEvent>,
    worker: tokio::task::JoinHandle<Result<()>>,
) -> Result<()> {
    let (background_tx, mut background_rx) = mpsc::unbounded_channel();
    let mut housekeeping = time::interval(Duration::from_secs(1));
    let mut worker_closed = false;
    redraw(ui_state, &controller, "initial draw failed")?;

    loop {
        tokio::select! {
            maybe_event = event_rx.recv() => {
                match maybe_event {
                    Some(WorkerEvent::Update(update)) => {
                        controller.apply_update(update);
                    }
                    Some(WorkerEvent::Chain(event)) => {
                        controller.on_chain_event(event, &background_tx);
                        continue;
                    }
                    None => {
                        warn!("refresh worker channel closed");
                        worker_closed = true;
                        break;
                    }
                }
                redraw(ui_state, &controller, "draw after snapshot refresh failed")?;
            }
            Some(message) = background_rx.recv() => {
                if controller.on_background(message) {
                    let _ = trigger_tx.send(RefreshTrigger::Refresh(RefreshScope::ALL));
                }
                redraw(ui_state, &controller, "draw after background update failed")?;
            }
            _ = housekeeping.tick() => {
                let expired = controller.notifications.expire(Instant::now());
                if expired || controller.pending().is_some() {
                    redraw(ui_state, &controller, "draw after housekeeping failed")?;
                }
            }
            _ = tokio::signal::ctrl_c() => {
                break;
            }
            raw_ev = ui::next_raw_event(input_events) => {
                let Some(event) = raw_ev? else {
                    break;
                };
                let Some(ev) = ui::interpret_event(ui_state, event) else {
                    continue;
                };
                match ev {
                    ui::UserEvent::Quit => break,
                    ui::UserEvent::Redraw => {}
                    ui::UserEvent::Cursor(direction) => controller.move_cursor(direction),
                    ui::UserEvent::ToggleNumber => controller.toggle_number_at_cursor(),
                    ui::UserEvent::ToggleAnimal => controller.toggle_animal_at_cursor(),
                    ui::UserEvent::ClearSlip => controller.clear_slip(),
                    ui::UserEvent::PlaceBet => match controller.prepare_bet() {
                        Ok(_) => ui_state.open_confirm(),
                        Err(e) => {
                            controller.notifications.report_failure("Bet rejected", &e);
                        }
                    },
                    ui::UserEvent::Withdraw => match controller.prepare_withdraw() {
                        Ok(_) => ui_state.open_confirm(),
                        Err(e) => {
                            controller.notifications.report_failure("Withdraw unavailable", &e);
                        }
                    },
                    ui::UserEvent::OpenAdmin => {
                        if controller.is_admin() {
                            ui_state.open_admin_menu();
                        } else {
                            controller.notifications.error("Admin console requires an admin wallet");
                        }
                    }
                    ui::UserEvent::AdminSubmit { kind, input } => {
                        match controller.prepare_admin(kind, &input) {
                            Ok(_) => ui_state.open_confirm(),
                            Err(e) => {
                                controller.notifications.report_failure("Admin input rejected", &e);
                            }
                        }
                    }
                    ui::UserEvent::Transfer { to, amount } => {
                        match controller.prepare_transfer(&to, &amount) {
                            Ok(_) => ui_state.open_confirm(),
                            Err(e) => {
                                controller.notifications.report_failure("Transfer rejected", &e);
                            }
                        }
                    }
                    ui::UserEvent::Confirm(approved) => {
                        controller.confirm(approved, &background_tx);
                    }
                    ui::UserEvent::Refresh => {
                        let _ = trigger_tx.send(RefreshTrigger::Refresh(RefreshScope::ALL));
                    }
                    ui::UserEvent::ToggleLanguage => controller.toggle_language(),
                    ui::UserEvent::Logout => {
                        if controller.logout() {
                            let _ = trigger_tx.send(RefreshTrigger::SetPlayer(None));
                            controller.notifications.info("Logged out; running read-only");
                        }
                    }
                }
                redraw(ui_state, &controller, "draw after input failed")?;
            }
        }
    }

    let _ = trigger_tx.send(RefreshTrigger::Shutdown);
    match worker.await {
        Ok(Ok(())) => {
            if worker_closed {
                return Err(eyre!("Refresh worker exited unexpectedly"));
            }
        }
        Ok(Err(err)) => {
            return Err(err).wrap_err("refresh worker failed");
        }
        Err(err) => {
            return Err(eyre!(err)).wrap_err("refresh worker panicked");
        }
    }
    Ok(())
}
