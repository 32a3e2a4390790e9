use std::fs;

use chrono::{TimeDelta, Utc};
use serde::Deserialize;
use tradier_http::{Interval, TimeRange, TradierClient, SANDBOX_ENDPOINT};

#[derive(Debug, Deserialize)]
struct SecretsFile {
    #[serde(rename = "TRADIER_TOKEN")]
    tradier_token: Option<String>,
    #[serde(rename = "TRADIER_ACCOUNT")]
    tradier_account: Option<String>,
    #[serde(rename = "TRADIER_ENDPOINT")]
    tradier_endpoint: Option<String>,
}

struct LiveCredentials {
    endpoint: String,
    token: String,
    account: Option<String>,
}

fn load_live_credentials() -> Result<LiveCredentials, String> {
    if let Ok(token) = std::env::var("TRADIER_TOKEN") {
        return Ok(LiveCredentials {
            endpoint: std::env::var("TRADIER_ENDPOINT")
                .unwrap_or_else(|_| SANDBOX_ENDPOINT.to_owned()),
            token,
            account: std::env::var("TRADIER_ACCOUNT").ok(),
        });
    }

    let content = fs::read_to_string("secrets.json")
        .map_err(|_| "TRADIER_TOKEN env or secrets.json is required".to_owned())?;
    let parsed: SecretsFile = serde_json::from_str(&content)
        .map_err(|err| format!("secrets.json could not be parsed: {err}"))?;

    Ok(LiveCredentials {
        endpoint: parsed
            .tradier_endpoint
            .unwrap_or_else(|| SANDBOX_ENDPOINT.to_owned()),
        token: parsed
            .tradier_token
            .ok_or_else(|| "missing TRADIER_TOKEN in secrets.json".to_owned())?,
        account: parsed.tradier_account,
    })
}

#[tokio::test]
async fn live_market_data_and_account_reads() -> anyhow::Result<()> {
    let credentials = match load_live_credentials() {
        Ok(values) => values,
        Err(_) => {
            eprintln!("skipping live test: credentials not found in env or secrets.json");
            return Ok(());
        }
    };

    let mut client = TradierClient::with_endpoint(credentials.endpoint, credentials.token);

    let clock = client.get_market_state().await?;
    assert!(!clock.state.is_empty());

    let quotes = client.get_quotes(&["SPY", "AAPL"]).await?;
    assert_eq!(quotes.len(), 2);

    let end = Utc::now();
    let bars = client
        .get_time_sales(
            "SPY",
            Interval::Daily,
            TimeRange::between(end - TimeDelta::days(30), end),
        )
        .await?;
    assert!(!bars.is_empty());
    assert!(bars.windows(2).all(|pair| pair[0].time <= pair[1].time));

    if let Some(account) = credentials.account {
        client.select_account(account);
        client.get_account_balances().await?;
        client.get_account_positions().await?;
        client.get_open_orders().await?;
    }

    Ok(())
}
