//! Test Prediction Client
//!
//! Generates customer records and posts them to a running prediction service.

use churn_prediction_service::types::customer::{
    CustomerRecord, INTERNET_FEATURE_VALUES, PAYMENT_METHOD_VALUES, YES_NO_VALUES,
};
use churn_prediction_service::types::prediction::{
    ChurnLabel, PredictionResponse, StatsResponse,
};
use churn_prediction_service::FeatureEncoder;
use rand::Rng;
use std::time::Duration;
use tracing::{info, warn};

/// Customer record generator for testing
struct CustomerGenerator {
    rng: rand::rngs::ThreadRng,
    customer_counter: u64,
}

impl CustomerGenerator {
    fn new() -> Self {
        Self {
            rng: rand::thread_rng(),
            customer_counter: 0,
        }
    }

    /// Long-tenure customer on a committed contract
    fn generate_loyal(&mut self) -> CustomerRecord {
        let tenure = self.rng.gen_range(24..=72);
        let contract = self.random_choice(&["One year", "Two year"]);
        let automatic: Vec<&'static str> = PAYMENT_METHOD_VALUES
            .iter()
            .copied()
            .filter(|method| method.ends_with("(automatic)"))
            .collect();
        let payment = self.random_choice(&automatic);
        let internet = self.random_choice(&["DSL", "No"]);
        self.generate(tenure, contract, payment, internet)
    }

    /// New fiber customer on a monthly contract paying by electronic check
    fn generate_at_risk(&mut self) -> CustomerRecord {
        let tenure = self.rng.gen_range(0..=12);
        self.generate(tenure, "Month-to-month", "Electronic check", "Fiber optic")
    }

    fn generate(
        &mut self,
        tenure: i64,
        contract: &str,
        payment_method: &str,
        internet_service: &str,
    ) -> CustomerRecord {
        self.customer_counter += 1;

        let phone_service = self.random_choice(YES_NO_VALUES);
        let multiple_lines = if phone_service == "Yes" {
            self.random_choice(YES_NO_VALUES)
        } else {
            "No phone service"
        };
        let monthly_charges: f64 = match internet_service {
            "Fiber optic" => self.rng.gen_range(70.0..110.0),
            "DSL" => self.rng.gen_range(40.0..80.0),
            _ => self.rng.gen_range(18.0..26.0),
        };
        // New customers have no billing history yet
        let total_charges = if tenure == 0 {
            " ".to_string()
        } else {
            let drift: f64 = self.rng.gen_range(0.9..1.1);
            format!("{:.2}", tenure as f64 * monthly_charges * drift)
        };

        CustomerRecord {
            customer_id: format!("{:04}-TEST", self.customer_counter),
            gender: self.random_choice(&["Male", "Female"]).to_string(),
            senior_citizen: if self.rng.gen_bool(0.16) { 1 } else { 0 },
            partner: self.random_choice(YES_NO_VALUES).to_string(),
            dependents: self.random_choice(YES_NO_VALUES).to_string(),
            tenure,
            phone_service: phone_service.to_string(),
            multiple_lines: multiple_lines.to_string(),
            internet_service: internet_service.to_string(),
            online_security: self.internet_feature(internet_service),
            online_backup: self.internet_feature(internet_service),
            device_protection: self.internet_feature(internet_service),
            tech_support: self.internet_feature(internet_service),
            streaming_tv: self.internet_feature(internet_service),
            streaming_movies: self.internet_feature(internet_service),
            contract: contract.to_string(),
            paperless_billing: self.random_choice(YES_NO_VALUES).to_string(),
            payment_method: payment_method.to_string(),
            monthly_charges: (monthly_charges * 100.0).round() / 100.0,
            total_charges,
        }
    }

    fn internet_feature(&mut self, internet_service: &str) -> String {
        if internet_service == "No" {
            "No internet service".to_string()
        } else {
            self.random_choice(&INTERNET_FEATURE_VALUES[..2]).to_string()
        }
    }

    fn random_choice<'a>(&mut self, choices: &[&'a str]) -> &'a str {
        choices[self.rng.gen_range(0..choices.len())]
    }
}

fn main() -> anyhow::Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(
            tracing_subscriber::EnvFilter::from_default_env()
                .add_directive("test_client=info".parse()?),
        )
        .init();

    info!("Starting Test Prediction Client");

    // Parse arguments
    let args: Vec<String> = std::env::args().collect();
    let base_url = args
        .get(1)
        .map(|s| s.trim_end_matches('/').to_string())
        .unwrap_or_else(|| "http://localhost:8080".to_string());
    let count: u64 = args.get(2).and_then(|s| s.parse().ok()).unwrap_or(100);
    let at_risk_rate = parse_rate(args.get(3).map(String::as_str))?;
    let delay_ms: u64 = args.get(4).and_then(|s| s.parse().ok()).unwrap_or(50);

    info!(
        base_url = %base_url,
        count = count,
        at_risk_rate = at_risk_rate,
        delay_ms = delay_ms,
        "Configuration loaded"
    );

    let agent = ureq::AgentBuilder::new()
        .timeout(Duration::from_secs(5))
        .build();

    if let Err(e) = agent.get(&format!("{}/health", base_url)).call() {
        warn!(error = %e, "Prediction service unreachable. Running in dry-run mode.");
        return run_dry_mode(count, at_risk_rate);
    }

    let mut generator = CustomerGenerator::new();
    let mut rng = rand::thread_rng();
    let predict_url = format!("{}/predict_model", base_url);

    let mut churn_count = 0;
    let mut rejected = 0;

    for i in 0..count {
        let record = if rng.gen_bool(at_risk_rate) {
            generator.generate_at_risk()
        } else {
            generator.generate_loyal()
        };

        match agent.post(&predict_url).send_json(&record) {
            Ok(response) => {
                let body: PredictionResponse = response.into_json()?;
                if body.prediction == ChurnLabel::Churn {
                    churn_count += 1;
                }
            }
            Err(ureq::Error::Status(code, response)) => {
                rejected += 1;
                warn!(
                    customer_id = %record.customer_id,
                    status = code,
                    body = %response.into_string().unwrap_or_default(),
                    "Prediction rejected"
                );
            }
            Err(e) => return Err(e.into()),
        }

        if (i + 1) % 10 == 0 {
            info!(
                "Sent {}/{} records ({} predicted churn, {} rejected)",
                i + 1,
                count,
                churn_count,
                rejected
            );
        }

        std::thread::sleep(Duration::from_millis(delay_ms));
    }

    let stats: StatsResponse = agent
        .get(&format!("{}/stats", base_url))
        .call()?
        .into_json()?;

    info!(
        "Completed! Sent {} records ({} predicted churn, {} rejected); server request_count = {}",
        count, churn_count, rejected, stats.request_count
    );

    Ok(())
}

/// At-risk share of generated records, defaulting to 0.3
fn parse_rate(arg: Option<&str>) -> anyhow::Result<f64> {
    let Some(arg) = arg else {
        return Ok(0.3);
    };
    let rate: f64 = arg
        .parse()
        .map_err(|_| anyhow::anyhow!("at-risk rate {arg:?} is not a number"))?;
    if !(0.0..=1.0).contains(&rate) {
        anyhow::bail!("at-risk rate {rate} must be between 0 and 1");
    }
    Ok(rate)
}

fn run_dry_mode(count: u64, at_risk_rate: f64) -> anyhow::Result<()> {
    info!("Running in dry-run mode (no prediction service)");

    let mut generator = CustomerGenerator::new();
    let encoder = FeatureEncoder::new();
    let mut rng = rand::thread_rng();

    for i in 0..count {
        let record = if rng.gen_bool(at_risk_rate) {
            generator.generate_at_risk()
        } else {
            generator.generate_loyal()
        };

        if let Err(errors) = record.validate() {
            warn!(customer_id = %record.customer_id, errors = %errors, "Generated invalid record");
            continue;
        }

        if (i + 1) % 10 == 0 || i == 0 {
            let json = serde_json::to_string_pretty(&record)?;
            let features = serde_json::to_string_pretty(&encoder.encode(&record))?;
            info!("Sample record {}:\n{}\nEncoded features:\n{}", i + 1, json, features);
        }
    }

    info!("Dry run complete");

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_rate() {
        assert_eq!(parse_rate(None).unwrap(), 0.3);
        assert_eq!(parse_rate(Some("0")).unwrap(), 0.0);
        assert_eq!(parse_rate(Some("1")).unwrap(), 1.0);
        assert_eq!(parse_rate(Some("0.75")).unwrap(), 0.75);
    }

    #[test]
    fn test_parse_rate_rejects_out_of_range() {
        assert!(parse_rate(Some("1.5")).is_err());
        assert!(parse_rate(Some("-0.1")).is_err());
        assert!(parse_rate(Some("NaN")).is_err());
        assert!(parse_rate(Some("lots")).is_err());
    }

    #[test]
    fn test_generated_records_are_valid() {
        let mut generator = CustomerGenerator::new();
        for _ in 0..50 {
            assert!(generator.generate_loyal().validate().is_ok());
            assert!(generator.generate_at_risk().validate().is_ok());
        }
    }
}
