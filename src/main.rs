use clap::{Parser, Subcommand};
use miette::{IntoDiagnostic, Result};
use paybridge::application::provider::IntentsPaymentProvider;
use paybridge::config::ProviderOptions;
use paybridge::domain::amount::{Amount, Currency};
use paybridge::domain::ports::{PaymentGatewayBox, PaymentProvider};
use paybridge::domain::session::{
    InitiatePaymentInput, PaymentContext, PaymentData, PaymentProviderInput, RefundPaymentInput,
    UpdatePaymentInput,
};
use paybridge::error::ProviderError;
use paybridge::infrastructure::http::HttpGateway;
use paybridge::infrastructure::in_memory::InMemoryGateway;
use paybridge::interfaces::json::output_writer::OutputWriter;
use paybridge::interfaces::json::webhook_reader::WebhookReader;
use paybridge::telemetry::{self, LogFormat};
use rust_decimal::Decimal;
use serde::Serialize;
use serde_json::Value;
use std::fs::File;
use std::io;
use std::path::PathBuf;

/// API key used when no vendor is contacted.
const OFFLINE_API_KEY: &str = "sk_offline";

#[derive(Parser)]
#[command(author, version, about, long_about = None)]
struct Cli {
    /// Provider config file (TOML). Without one, options come from the environment.
    #[arg(long, global = true)]
    config: Option<PathBuf>,

    /// Run against a fresh in-memory vendor instead of the real API.
    ///
    /// Nothing survives between invocations, so only `initiate` and `webhook`
    /// are useful offline; commands taking an intent id report `resource_missing`.
    #[arg(long, global = true)]
    offline: bool,

    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand)]
enum Command {
    /// Create a payment for a new session
    Initiate {
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        currency: String,
        #[arg(long)]
        session_id: Option<String>,
        #[arg(long)]
        customer: Option<String>,
        #[arg(long)]
        idempotency_key: Option<String>,
    },
    /// Check whether a payment is authorized
    Authorize { intent_id: String },
    /// Capture an authorized payment
    Capture { intent_id: String },
    /// Cancel a payment
    Cancel { intent_id: String },
    /// Fetch a payment
    Retrieve { intent_id: String },
    /// Print a payment's session status
    Status { intent_id: String },
    /// Refund part or all of a captured payment
    Refund {
        intent_id: String,
        #[arg(long)]
        amount: Decimal,
    },
    /// Change the amount of a payment
    Update {
        intent_id: String,
        #[arg(long)]
        amount: Decimal,
        #[arg(long)]
        currency: String,
    },
    /// Decode a webhook payload file into a session action
    Webhook {
        payload: PathBuf,
        /// Value of the vendor's signature header
        #[arg(long)]
        signature: Option<String>,
    },
}

fn resolve_options(cli: &Cli) -> paybridge::error::Result<ProviderOptions> {
    if let Some(path) = &cli.config {
        return ProviderOptions::load(path);
    }
    if cli.offline || matches!(cli.command, Command::Webhook { .. }) {
        let mut options = ProviderOptions::new(OFFLINE_API_KEY);
        options.apply_overrides(|key| std::env::var(key).ok());
        return Ok(options);
    }
    ProviderOptions::from_env()
}

fn emit<T: Serialize>(result: std::result::Result<T, ProviderError>) -> Result<()> {
    match result {
        Ok(value) => {
            let stdout = io::stdout();
            OutputWriter::new(stdout.lock())
                .write(&value)
                .into_diagnostic()
        }
        Err(err) => {
            OutputWriter::new(io::stderr().lock())
                .write(&err)
                .into_diagnostic()?;
            std::process::exit(1);
        }
    }
}

fn parse_amount(amount: Decimal, currency: &str) -> Result<(Amount, Currency)> {
    Ok((
        Amount::new(amount).into_diagnostic()?,
        Currency::new(currency).into_diagnostic()?,
    ))
}

#[tokio::main]
async fn main() -> Result<()> {
    telemetry::init(LogFormat::from_env());
    let cli = Cli::parse();

    let options = resolve_options(&cli).into_diagnostic()?;
    let gateway: PaymentGatewayBox = if cli.offline {
        Box::new(InMemoryGateway::new())
    } else {
        Box::new(HttpGateway::from_options(&options).into_diagnostic()?)
    };
    let provider = IntentsPaymentProvider::new(gateway, options);

    match cli.command {
        Command::Initiate {
            amount,
            currency,
            session_id,
            customer,
            idempotency_key,
        } => {
            let (amount, currency_code) = parse_amount(amount, &currency)?;
            let mut data = PaymentData::new();
            if let Some(session_id) = session_id {
                data.insert("session_id".to_string(), Value::String(session_id));
            }
            let input = InitiatePaymentInput {
                amount,
                currency_code,
                context: PaymentContext {
                    customer_id: customer,
                    email: None,
                    idempotency_key,
                },
                data,
            };
            emit(provider.initiate_payment(input).await)
        }
        Command::Authorize { intent_id } => emit(
            provider
                .authorize_payment(PaymentProviderInput::for_intent(&intent_id))
                .await,
        ),
        Command::Capture { intent_id } => emit(
            provider
                .capture_payment(PaymentProviderInput::for_intent(&intent_id))
                .await,
        ),
        Command::Cancel { intent_id } => emit(
            provider
                .cancel_payment(PaymentProviderInput::for_intent(&intent_id))
                .await,
        ),
        Command::Retrieve { intent_id } => emit(
            provider
                .retrieve_payment(PaymentProviderInput::for_intent(&intent_id))
                .await,
        ),
        Command::Status { intent_id } => emit(
            provider
                .get_payment_status(PaymentProviderInput::for_intent(&intent_id))
                .await,
        ),
        Command::Refund { intent_id, amount } => {
            let input = RefundPaymentInput {
                data: PaymentProviderInput::for_intent(&intent_id).data,
                amount: Amount::new(amount).into_diagnostic()?,
                context: PaymentContext::default(),
            };
            emit(provider.refund_payment(input).await)
        }
        Command::Update {
            intent_id,
            amount,
            currency,
        } => {
            let (amount, currency_code) = parse_amount(amount, &currency)?;
            let input = UpdatePaymentInput {
                amount,
                currency_code,
                context: PaymentContext::default(),
                data: PaymentProviderInput::for_intent(&intent_id).data,
            };
            emit(provider.update_payment(input).await)
        }
        Command::Webhook { payload, signature } => {
            let file = File::open(payload).into_diagnostic()?;
            let payload = WebhookReader::new(file)
                .with_signature(signature)
                .read_payload()
                .into_diagnostic()?;
            emit(provider.get_webhook_action_and_data(payload).await)
        }
    }
}
