//! Trip planning with the AI concierge and paying from the wallet
//!
//! Requires `RUMO_GEMINI_API_KEY`. The wallet is stored under `RUMO_DATA_DIR`
//! (or the platform data directory).

use chrono::NaiveDate;
use rumo::{
    ClientConfig, Concierge, ConciergeReply, GeminiClient, JsonFileWallet, Transaction,
    TravelPreferences, TripRequest, WalletStore,
    concierge::{Budget, Pace},
    init_logging,
};

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    init_logging(tracing::Level::INFO)?;

    let concierge = Concierge::new(GeminiClient::new(&ClientConfig::from_env()?)?);
    let start = NaiveDate::from_ymd_opt(2025, 7, 10).ok_or("invalid date")?;
    let end = NaiveDate::from_ymd_opt(2025, 7, 14).ok_or("invalid date")?;
    let request = TripRequest::new("Bonito, MS", start, end)?.with_preferences(TravelPreferences {
        budget: Budget::Moderate,
        pace: Pace::Intense,
        interests: vec!["flutuação".into(), "cachoeiras".into()],
        travelers: 2,
    });

    match concierge.ask(&request).await {
        ConciergeReply::Structured {
            intro,
            recommendations,
        } => {
            println!("{intro}\n");
            for r in recommendations {
                let day = r.day.map(|d| format!("Dia {d}: ")).unwrap_or_default();
                println!("- {day}{} {}", r.title, r.description);
            }
        }
        ConciergeReply::Text(text) => println!("{text}"),
        ConciergeReply::Unavailable { message } => println!("{message}"),
    }

    let wallet = JsonFileWallet::open_default()?;
    if wallet.balance().await? == 0 {
        wallet
            .append_transaction(Transaction::credit(50_000, "Saldo inicial"))
            .await?;
    }
    let paid = wallet
        .append_transaction(Transaction::debit(12_900, "Flutuação no Rio da Prata"))
        .await;
    match paid {
        Ok(tx) => println!("\nPaid R$ {:.2} (#{})", tx.amount_cents as f64 / 100.0, tx.id),
        Err(e) => println!("\nPayment refused: {e}"),
    }
    println!("Balance: R$ {:.2}", wallet.balance().await? as f64 / 100.0);

    Ok(())
}
