use serde::{
    Deserialize,
    Serialize,
};

#[derive(Clone, Copy, Debug, Default, PartialEq, Eq, Serialize, Deserialize)]
#[serde(rename_all = "lowercase")]
pub enum Language {
    #[default]
    En,
    Pt,
}

impl Language {
    pub fn toggled(self) -> Self {
        match self {
            Language::En => Language::Pt,
            Language::Pt => Language::En,
        }
    }

    pub fn code(self) -> &'static str {
        match self {
            Language::En => "EN",
            Language::Pt => "PT",
        }
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Text {
    Title,
    Round,
    Pot,
    BonusPot,
    BetPrice,
    Paused,
    Open,
    DrawInProgress,
    Balance,
    PendingPrize,
    Withdraw,
    Numbers,
    Animals,
    Selection,
    Cost,
    MyBets,
    NoBets,
    LastDraw,
    NoDraws,
    History,
    Leaderboard,
    NoLeaderboard,
    Player,
    Bets,
    Verified,
    Mismatch,
    ReadOnly,
    Loading,
    Admin,
    ConfirmBet,
    ConfirmTx,
    Yes,
    No,
    QuitPrompt,
    Waiting,
    BetsPlaced,
    PrizeWithdrawn,
    AdminDone,
    TransferSent,
    HelpGame,
    HelpHistory,
    RoundUse,
    Payout,
    MaxPerRound,
    Winners,
    ByNumber,
    ByAnimal,
    Computed,
    OracleValue,
    DestructiveWarning,
    RetryHint,
    ChainFallback,
    Transactions,
    Score,
    StatusTitle,
    ConfirmTitle,
    QuitTitle,
    ErrorTitle,
    MenuHint,
    InputHint,
    Wallet,
    Overflow,
    AdminHint,
    Profile,
    DepositAddress,
    DepositHint,
    SendMon,
    Destination,
    Amount,
    ProfileHint,
    HowItWorks,
    RulesBetting,
    RulesDraw,
    RulesFormula,
    RulesVerify,
    RulesPrizes,
    RulesAnimals,
}

pub fn tr(language: Language, text: Text) -> &'static str {
    match language {
        Language::En => english(text),
        Language::Pt => portuguese(text),
    }
}

fn english(text: Text) -> &'static str {
    match text {
        Text::Title => "Jogo do Bicho on Monad",
        Text::Round => "Round",
        Text::Pot => "Pot",
        Text::BonusPot => "Bonus",
        Text::BetPrice => "Bet price",
        Text::Paused => "PAUSED",
        Text::Open => "OPEN",
        Text::DrawInProgress => "DRAW IN PROGRESS",
        Text::Balance => "Balance",
        Text::PendingPrize => "Prize to withdraw",
        Text::Withdraw => "[w] withdraw",
        Text::Numbers => "Numbers",
        Text::Animals => "Animals",
        Text::Selection => "Selection",
        Text::Cost => "Cost",
        Text::MyBets => "My bets this round",
        Text::NoBets => "No bets yet",
        Text::LastDraw => "Last draw",
        Text::NoDraws => "No draws yet",
        Text::History => "History",
        Text::Leaderboard => "Leaderboard - Top 10",
        Text::NoLeaderboard => "No bets to rank yet",
        Text::Player => "Player",
        Text::Bets => "Bets",
        Text::Verified => "verified",
        Text::Mismatch => "MISMATCH",
        Text::ReadOnly => "read-only (no wallet)",
        Text::Loading => "Loading game...",
        Text::Admin => "Admin",
        Text::ConfirmBet => "Place these bets?",
        Text::ConfirmTx => "Sign and send this transaction?",
        Text::Yes => "[y] yes",
        Text::No => "[n] no",
        Text::QuitPrompt => "Quit? [y/n]",
        Text::Waiting => "Waiting for confirmation...",
        Text::BetsPlaced => "Bets placed!",
        Text::PrizeWithdrawn => "Prize withdrawn!",
        Text::AdminDone => "Admin action confirmed",
        Text::TransferSent => "Transfer sent!",
        Text::HelpGame => {
            "arrows move  space toggle  a animal  c clear  enter bet  w withdraw  p profile  tab view  r refresh  L lang  o logout  q quit"
        }
        Text::HelpHistory => "up/down scroll  p profile  tab view  q quit",
        Text::RoundUse => "Round use",
        Text::Payout => "Payout",
        Text::MaxPerRound => "Max per round",
        Text::Winners => "Winners",
        Text::ByNumber => "by number",
        Text::ByAnimal => "by animal",
        Text::Computed => "computed",
        Text::OracleValue => "oracle value",
        Text::DestructiveWarning => "This affects every player in the current round.",
        Text::RetryHint => "Press r to retry.",
        Text::ChainFallback => "(read from chain; names api unavailable)",
        Text::Transactions => "Txs",
        Text::Score => "Score",
        Text::StatusTitle => "Status",
        Text::ConfirmTitle => "Confirm",
        Text::QuitTitle => "Quit",
        Text::ErrorTitle => "Error",
        Text::MenuHint => "Enter=select Esc=close",
        Text::InputHint => "Enter=submit Esc=back",
        Text::Wallet => "wallet",
        Text::Overflow => "overflow",
        Text::AdminHint => "A admin",
        Text::Profile => "Profile",
        Text::DepositAddress => "Game wallet address",
        Text::DepositHint => "Send MON to this address to fund your bets.",
        Text::SendMon => "Send MON to another wallet",
        Text::Destination => "Destination",
        Text::Amount => "Amount",
        Text::ProfileHint => "Tab=next field Enter=send Esc=close",
        Text::HowItWorks => "How it works",
        Text::RulesBetting => {
            "1. Betting: pick numbers (00-95) and/or animals. Every pick costs the bet price and all bets of the round go into one pot."
        }
        Text::RulesDraw => {
            "2. The draw: the contract asks the Pyth Network oracle for a random 32-byte value generated off-chain, which nobody can predict."
        }
        Text::RulesFormula => "3. Winning number = oracle value % 96 (always 00-95); winning animal = number / 6",
        Text::RulesVerify => "Every draw in History is recomputed here and marked verified or MISMATCH.",
        Text::RulesPrizes => {
            "4. Prizes: the pot is split between number and animal winners by the published percentages. With no winner it rolls over. Prizes wait in your withdrawal balance."
        }
        Text::RulesAnimals => "Animals and their numbers",
    }
}

fn portuguese(text: Text) -> &'static str {
    match text {
        Text::Title => "Jogo do Bicho na Monad",
        Text::Round => "Rodada",
        Text::Pot => "Pote",
        Text::BonusPot => "Bonus",
        Text::BetPrice => "Preco da aposta",
        Text::Paused => "PAUSADO",
        Text::Open => "ABERTO",
        Text::DrawInProgress => "SORTEIO EM ANDAMENTO",
        Text::Balance => "Saldo",
        Text::PendingPrize => "Premio a sacar",
        Text::Withdraw => "[w] sacar",
        Text::Numbers => "Numeros",
        Text::Animals => "Bichos",
        Text::Selection => "Selecao",
        Text::Cost => "Custo",
        Text::MyBets => "Minhas apostas na rodada",
        Text::NoBets => "Nenhuma aposta ainda",
        Text::LastDraw => "Ultimo sorteio",
        Text::NoDraws => "Nenhum sorteio ainda",
        Text::History => "Historico",
        Text::Leaderboard => "Ranking - Top 10",
        Text::NoLeaderboard => "Ainda nao ha apostas para exibir no ranking",
        Text::Player => "Jogador",
        Text::Bets => "Apostas",
        Text::Verified => "verificado",
        Text::Mismatch => "DIVERGENTE",
        Text::ReadOnly => "somente leitura (sem carteira)",
        Text::Loading => "Carregando jogo...",
        Text::Admin => "Admin",
        Text::ConfirmBet => "Confirmar estas apostas?",
        Text::ConfirmTx => "Assinar e enviar esta transacao?",
        Text::Yes => "[y] sim",
        Text::No => "[n] nao",
        Text::QuitPrompt => "Sair? [y/n]",
        Text::Waiting => "Aguardando confirmacao...",
        Text::BetsPlaced => "Apostas realizadas!",
        Text::PrizeWithdrawn => "Premio sacado!",
        Text::AdminDone => "Acao de admin confirmada",
        Text::TransferSent => "Transferencia enviada!",
        Text::HelpGame => {
            "setas movem  espaco marca  a bicho  c limpa  enter aposta  w saca  p perfil  tab tela  r atualiza  L idioma  o sair da conta  q sai"
        }
        Text::HelpHistory => "cima/baixo rola  p perfil  tab tela  q sai",
        Text::RoundUse => "Uso na rodada",
        Text::Payout => "Premio",
        Text::MaxPerRound => "Maximo por rodada",
        Text::Winners => "Vencedores",
        Text::ByNumber => "por numero",
        Text::ByAnimal => "por bicho",
        Text::Computed => "calculado",
        Text::OracleValue => "valor do oraculo",
        Text::DestructiveWarning => "Isto afeta todos os jogadores da rodada atual.",
        Text::RetryHint => "Pressione r para tentar de novo.",
        Text::ChainFallback => "(lido da blockchain; api de nomes indisponivel)",
        Text::Transactions => "Txs",
        Text::Score => "Pontos",
        Text::StatusTitle => "Estado",
        Text::ConfirmTitle => "Confirmar",
        Text::QuitTitle => "Sair",
        Text::ErrorTitle => "Erro",
        Text::MenuHint => "Enter=escolher Esc=fechar",
        Text::InputHint => "Enter=enviar Esc=voltar",
        Text::Wallet => "carteira",
        Text::Overflow => "estouro",
        Text::AdminHint => "A admin",
        Text::Profile => "Perfil",
        Text::DepositAddress => "Endereco da carteira do jogo",
        Text::DepositHint => "Envie MON para este endereco para financiar suas apostas.",
        Text::SendMon => "Enviar MON para outra carteira",
        Text::Destination => "Destino",
        Text::Amount => "Valor",
        Text::ProfileHint => "Tab=proximo campo Enter=enviar Esc=fechar",
        Text::HowItWorks => "Como funciona",
        Text::RulesBetting => {
            "1. Apostas: escolha numeros (00-95) e/ou bichos. Cada escolha custa o preco da aposta e todas as apostas da rodada formam um pote."
        }
        Text::RulesDraw => {
            "2. O sorteio: o contrato pede ao oraculo Pyth Network um valor aleatorio de 32 bytes gerado fora da blockchain, impossivel de prever."
        }
        Text::RulesFormula => "3. Numero vencedor = valor do oraculo % 96 (sempre 00-95); bicho vencedor = numero / 6",
        Text::RulesVerify => "Cada sorteio do Historico e recalculado aqui e marcado como verificado ou DIVERGENTE.",
        Text::RulesPrizes => {
            "4. Premios: o pote e dividido entre acertadores de numero e de bicho pelos percentuais publicados. Sem vencedor, acumula. Os premios ficam no saldo de saque."
        }
        Text::RulesAnimals => "Bichos e seus numeros",
    }
}

#[cfg(test)]
mod tests {
    #![allow(non_snake_case)]
    use super::*;

    #[test]
    fn language__serialises_as_lowercase_code() {
        assert_eq!(serde_json::to_string(&Language::Pt).unwrap(), "\"pt\"");
        assert_eq!(
            serde_json::from_str::<Language>("\"en\"").unwrap(),
            Language::En
        );
        assert_eq!(Language::En.toggled(), Language::Pt);
    }

    #[test]
    fn tr__differs_between_languages() {
        assert_ne!(tr(Language::En, Text::Pot), tr(Language::Pt, Text::Pot));
    }

    #[test]
    fn tr__labels_and_hints_are_translated() {
        for text in [
            Text::RoundUse,
            Text::Winners,
            Text::DestructiveWarning,
            Text::RetryHint,
            Text::ChainFallback,
            Text::Score,
            Text::StatusTitle,
            Text::ConfirmTitle,
            Text::MenuHint,
            Text::InputHint,
            Text::QuitTitle,
            Text::ErrorTitle,
            Text::Payout,
            Text::MaxPerRound,
            Text::Profile,
            Text::ProfileHint,
            Text::HowItWorks,
            Text::RulesBetting,
        ] {
            assert_ne!(tr(Language::En, text), tr(Language::Pt, text), "{text:?}");
        }
    }

    #[test]
    fn tr__rules_state_the_mod_96_formula_in_both_languages() {
        assert!(tr(Language::En, Text::RulesFormula).contains("% 96"));
        assert!(tr(Language::Pt, Text::RulesFormula).contains("% 96"));
    }
}
