//! Command-line driver for the checkout flow and the gateway signature helpers

use anyhow::{anyhow, bail, Context, Result};
use chrono::Utc;
use clap::{Args, Parser, Subcommand};
use std::path::PathBuf;
use std::time::Duration;

use edusmart_payments::checkout::{
    payment_request_id_from_url, Alert, Checkout, CheckoutClient, CheckoutContext,
    InitiationOutcome, PollConfig, Presentation, ResultPresenter, ResultView,
};
use edusmart_payments::logging;
use edusmart_payments::payments::signature::{RequestSigner, SignatureVerifier, SignedRequest};

#[derive(Debug, Parser)]
#[command(name = "checkout", version, about = "EduSmart checkout client")]
struct Cli {
    /// Base URL of the checkout backend
    #[arg(
        long,
        global = true,
        env = "CHECKOUT_BACKEND_URL",
        default_value = "http://localhost:8080"
    )]
    backend: String,

    #[command(subcommand)]
    command: Command,
}

#[derive(Debug, Subcommand)]
enum Command {
    /// Create a payment and print the gateway page
    Pay {
        #[arg(long, default_value = "PAYPAY")]
        method: String,
        #[arg(long, default_value = "6000")]
        amount: String,
        #[arg(long, default_value = "JPY")]
        currency: String,
    },
    /// Poll a payment until it settles, from a return URL or a bare id
    Poll {
        target: String,
        #[arg(long, default_value_t = 5)]
        attempts: u32,
        #[arg(long, default_value_t = 2000)]
        interval_ms: u64,
        #[arg(long, default_value_t = 8000)]
        dismiss_ms: u64,
    },
    /// Sign a request with a merchant private key
    Sign {
        #[arg(long)]
        private_key: PathBuf,
        #[arg(long, default_value = "1")]
        key_version: String,
        #[command(flatten)]
        request: RequestArgs,
    },
    /// Verify a signature against a public key
    Verify {
        #[arg(long)]
        public_key: PathBuf,
        /// Bare URL-encoded signature or the full `Signature` header value
        #[arg(long)]
        signature: String,
        #[command(flatten)]
        request: RequestArgs,
    },
}

#[derive(Debug, Args)]
struct RequestArgs {
    #[arg(long)]
    client_id: String,
    #[arg(long, default_value = "POST")]
    method: String,
    #[arg(long)]
    path: String,
    /// Epoch milliseconds; defaults to now when signing
    #[arg(long)]
    request_time: Option<String>,
    /// Raw body, or `@file` to read it from a file
    #[arg(long, default_value = "")]
    body: String,
}

impl RequestArgs {
    fn body(&self) -> Result<String> {
        match self.body.strip_prefix('@') {
            Some(path) => std::fs::read_to_string(path)
                .with_context(|| format!("Failed to read body from {}", path)),
            None => Ok(self.body.clone()),
        }
    }
}

/// Prints the checkout page states to the terminal
struct TerminalView;

impl ResultView for TerminalView {
    fn show(&mut self, presentation: &Presentation) {
        println!("{}", presentation.title);
        println!("  {}", presentation.message);
    }

    fn clear(&mut self) {}

    fn navigate_home(&mut self) {
        println!("(back to checkout)");
    }

    fn redirect(&mut self, url: &str) {
        println!("Open the payment page: {}", url);
    }

    fn alert(&mut self, alert: &Alert) {
        eprintln!("{}: {}", alert.title, alert.message);
    }
}

#[tokio::main]
async fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    logging::init();

    let cli = Cli::parse();

    match cli.command {
        Command::Pay {
            method,
            amount,
            currency,
        } => {
            let checkout = Checkout::new(CheckoutClient::new(&cli.backend)?);
            let context = CheckoutContext::new(method, amount, currency);
            match checkout.submit(&context, &mut TerminalView).await {
                InitiationOutcome::Redirected { .. } => Ok(()),
                InitiationOutcome::Aborted(alert) => bail!(alert.message),
                InitiationOutcome::Failed { reason, .. } => bail!(reason),
            }
        }
        Command::Poll {
            target,
            attempts,
            interval_ms,
            dismiss_ms,
        } => {
            let payment_request_id = if target.contains("://") {
                payment_request_id_from_url(&target)
                    .ok_or_else(|| anyhow!("No paymentRequestId in {}", target))?
            } else {
                target
            };

            let checkout = Checkout::new(CheckoutClient::new(&cli.backend)?)
                .with_poll_config(PollConfig {
                    max_attempts: attempts,
                    interval: Duration::from_millis(interval_ms),
                })
                .with_presenter(ResultPresenter::new(Duration::from_millis(dismiss_ms)));

            let outcome = checkout.follow(&payment_request_id, &mut TerminalView).await;
            println!(
                "{} after {} attempt(s){}",
                outcome.status,
                outcome.attempts,
                if outcome.exhausted { ", budget exhausted" } else { "" }
            );
            Ok(())
        }
        Command::Sign {
            private_key,
            key_version,
            request,
        } => {
            let material = std::fs::read_to_string(&private_key)
                .with_context(|| format!("Failed to read {}", private_key.display()))?;
            let signer =
                RequestSigner::from_private_key(&material, &request.client_id, key_version)?;
            let request_time = request
                .request_time
                .clone()
                .unwrap_or_else(|| Utc::now().timestamp_millis().to_string());
            let body = request.body()?;

            println!("Client-Id: {}", signer.client_id());
            println!("Request-Time: {}", request_time);
            println!(
                "Signature: {}",
                signer.signature_header(&request.method, &request.path, &request_time, &body)
            );
            Ok(())
        }
        Command::Verify {
            public_key,
            signature,
            request,
        } => {
            let material = std::fs::read_to_string(&public_key)
                .with_context(|| format!("Failed to read {}", public_key.display()))?;
            let verifier = SignatureVerifier::from_public_key(&material)?;
            let request_time = request
                .request_time
                .clone()
                .ok_or_else(|| anyhow!("--request-time is required to verify"))?;
            let body = request.body()?;

            let valid = verifier.verify(
                &SignedRequest {
                    method: &request.method,
                    path: &request.path,
                    client_id: &request.client_id,
                    request_time: &request_time,
                    body: &body,
                },
                &signature,
            )?;

            if valid {
                println!("Signature valid");
                Ok(())
            } else {
                bail!("Signature invalid")
            }
        }
    }
}
