use clap::{Args, Parser, Subcommand, ValueEnum};
use std::fs;
use std::net::{IpAddr, SocketAddr};
use std::path::{Path, PathBuf};

use crate::api::run_http_server;
use crate::core::{
    Frequency, Inputs, ObjectiveKind, calculate, default_tax_config, resolve_tax_config,
};
use crate::error::Error;

#[derive(Parser, Debug)]
#[command(
    name = "don-calc",
    version,
    about = "French donation tax-reduction calculator (75%/66% tranches, 20% income ceiling)"
)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Command,
}

#[derive(Subcommand, Debug)]
pub enum Command {
    /// Serve the JSON API over HTTP
    Serve(ServeArgs),
    /// Compute a donation, its tax reduction and its net cost
    Calc(CalcArgs),
    /// Print the cap/rate configuration for a fiscal year
    TaxConfig(TaxConfigArgs),
}

#[derive(Args, Debug)]
pub struct ServeArgs {
    #[arg(long, env = "DON_CALC_HOST", default_value = "0.0.0.0")]
    pub host: IpAddr,
    #[arg(long, env = "DON_CALC_PORT", default_value_t = 8080)]
    pub port: u16,
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliFrequency {
    Once,
    Monthly,
}

impl From<CliFrequency> for Frequency {
    fn from(value: CliFrequency) -> Self {
        match value {
            CliFrequency::Once => Frequency::Once,
            CliFrequency::Monthly => Frequency::Monthly,
        }
    }
}

#[derive(Copy, Clone, Debug, Eq, PartialEq, ValueEnum)]
pub enum CliObjective {
    MaxAdvantage,
    DonationTarget,
    NetCostTarget,
}

impl From<CliObjective> for ObjectiveKind {
    fn from(value: CliObjective) -> Self {
        match value {
            CliObjective::MaxAdvantage => ObjectiveKind::MaxAdvantage,
            CliObjective::DonationTarget => ObjectiveKind::DonationTarget,
            CliObjective::NetCostTarget => ObjectiveKind::NetCostTarget,
        }
    }
}

/// Flags override the values read from `--input`, which themselves override
/// the product defaults.
#[derive(Args, Debug, Default)]
pub struct CalcArgs {
    #[arg(long, help = "JSON file holding an inputs record")]
    pub input: Option<PathBuf>,
    #[arg(long, help = "Fiscal year, e.g. 2025")]
    pub year: Option<f64>,
    #[arg(long, help = "Taxable income in euros")]
    pub taxable_income: Option<f64>,
    #[arg(long, value_enum)]
    pub frequency: Option<CliFrequency>,
    #[arg(long, value_enum)]
    pub objective: Option<CliObjective>,
    #[arg(long, help = "Periodic donation for a donation-target objective")]
    pub amount: Option<f64>,
    #[arg(long, help = "Periodic net cost for a net-cost-target objective")]
    pub cost: Option<f64>,
    #[arg(long, overrides_with = "no_expert", help = "Enable meal-voucher donations")]
    pub expert: bool,
    #[arg(long, overrides_with = "expert", help = "Disable meal-voucher donations")]
    pub no_expert: bool,
    #[arg(long, help = "Meal-voucher face value in euros")]
    pub tr_face_value: Option<f64>,
    #[arg(long, help = "Number of meal vouchers per period")]
    pub tr_quantity: Option<f64>,
    #[arg(long, help = "Employer share of the voucher in percent")]
    pub tr_employer_rate: Option<f64>,
    #[arg(long, help = "Employee share of the voucher in percent")]
    pub tr_employee_rate: Option<f64>,
    #[arg(long, help = "Pretty-print the JSON result")]
    pub pretty: bool,
}

#[derive(Args, Debug)]
pub struct TaxConfigArgs {
    #[arg(long)]
    pub year: Option<i32>,
}

pub fn build_inputs(args: &CalcArgs) -> Result<Inputs, Error> {
    let mut inputs = match &args.input {
        Some(path) => read_inputs(path)?,
        None => Inputs::default(),
    };

    if let Some(v) = args.year {
        inputs.year = v;
    }
    if let Some(v) = args.taxable_income {
        inputs.taxable_income = v;
    }
    if let Some(v) = args.frequency {
        inputs.frequency = v.into();
    }
    if args.expert {
        inputs.expert_mode = true;
    } else if args.no_expert {
        inputs.expert_mode = false;
    }
    if let Some(v) = args.tr_face_value {
        inputs.tr_face_value = v;
    }
    if let Some(v) = args.tr_quantity {
        inputs.tr_quantity = v;
    }
    if let Some(v) = args.tr_employer_rate {
        inputs.tr_employer_rate = v;
    }
    if let Some(v) = args.tr_employee_rate {
        inputs.tr_employee_rate = v;
    }
    inputs.override_objective(args.objective.map(Into::into), args.amount, args.cost);

    Ok(inputs)
}

fn read_inputs(path: &Path) -> Result<Inputs, Error> {
    let contents = fs::read_to_string(path).map_err(|source| Error::ReadInput {
        path: path.to_path_buf(),
        source,
    })?;
    Ok(serde_json::from_str(&contents)?)
}

fn to_json<T: serde::Serialize>(value: &T, pretty: bool) -> Result<String, Error> {
    let json = if pretty {
        serde_json::to_string_pretty(value)?
    } else {
        serde_json::to_string(value)?
    };
    Ok(json)
}

pub async fn run(cli: Cli) -> Result<(), Error> {
    match cli.command {
        Command::Serve(args) => {
            run_http_server(SocketAddr::new(args.host, args.port)).await?;
        }
        Command::Calc(args) => {
            let inputs = build_inputs(&args)?;
            let result = calculate(&inputs);
            println!("{}", to_json(&result, args.pretty)?);
        }
        Command::TaxConfig(args) => {
            let year = args.year.unwrap_or_else(|| default_tax_config().year);
            println!("{}", to_json(&resolve_tax_config(year), true)?);
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::core::Objective;
    use std::io::Write;
    use tempfile::NamedTempFile;

    fn input_file(json: &str) -> NamedTempFile {
        let mut file = NamedTempFile::new().expect("temp file should be created");
        file.write_all(json.as_bytes())
            .expect("temp file should be writable");
        file
    }

    fn calc_args(argv: &[&str]) -> CalcArgs {
        let argv = ["don-calc", "calc"].into_iter().chain(argv.iter().copied());
        let cli = Cli::try_parse_from(argv).expect("arguments should parse");
        let Command::Calc(args) = cli.command else {
            panic!("expected calc command");
        };
        args
    }

    #[test]
    fn calc_flags_override_defaults() {
        let cli = Cli::try_parse_from([
            "don-calc",
            "calc",
            "--taxable-income",
            "40000",
            "--frequency",
            "monthly",
            "--objective",
            "donation-target",
            "--amount",
            "100",
            "--expert",
            "--tr-quantity",
            "20",
        ])
        .expect("arguments should parse");
        let Command::Calc(args) = cli.command else {
            panic!("expected calc command");
        };

        let inputs = build_inputs(&args).expect("valid inputs");
        assert_eq!(inputs.taxable_income, 40_000.0);
        assert_eq!(inputs.frequency, Frequency::Monthly);
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 100.0 })
        );
        assert!(inputs.expert_mode);
        assert_eq!(inputs.tr_quantity, 20.0);
        assert_eq!(inputs.tr_face_value, 8.5);
    }

    #[test]
    fn calc_without_flags_uses_product_defaults() {
        let inputs = build_inputs(&CalcArgs::default()).expect("valid inputs");
        assert_eq!(inputs, Inputs::default());
    }

    #[test]
    fn input_file_is_read_and_flags_win() {
        let file = input_file(
            r#"{"taxableIncome": 30000, "objective": {"type": "net_cost_target", "cost": 500}}"#,
        );
        let args = CalcArgs {
            input: Some(file.path().to_path_buf()),
            taxable_income: Some(50_000.0),
            ..CalcArgs::default()
        };
        let inputs = build_inputs(&args).expect("valid inputs");

        assert_eq!(inputs.taxable_income, 50_000.0);
        assert_eq!(inputs.objective, Some(Objective::NetCostTarget { cost: 500.0 }));
    }

    #[test]
    fn amount_flag_updates_objective_from_file() {
        let file = input_file(r#"{"objective": {"type": "donation_target", "amount": 500}}"#);
        let path = file.path().to_string_lossy().into_owned();

        let inputs = build_inputs(&calc_args(&["--input", &path, "--amount", "700"]))
            .expect("valid inputs");
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 700.0 })
        );

        let inputs = build_inputs(&calc_args(&["--input", &path, "--cost", "90"]))
            .expect("valid inputs");
        assert_eq!(
            inputs.objective,
            Some(Objective::DonationTarget { amount: 500.0 })
        );
    }

    #[test]
    fn no_expert_flag_overrides_file() {
        let file = input_file(r#"{"expertMode": true, "trQuantity": 10}"#);
        let path = file.path().to_string_lossy().into_owned();

        let inputs = build_inputs(&calc_args(&["--input", &path, "--no-expert"]))
            .expect("valid inputs");
        assert!(!inputs.expert_mode);
        assert_eq!(inputs.tr_quantity, 10.0);

        let inputs = build_inputs(&calc_args(&["--input", &path])).expect("valid inputs");
        assert!(inputs.expert_mode);

        let args = calc_args(&["--no-expert", "--expert"]);
        assert!(build_inputs(&args).expect("valid inputs").expert_mode);
    }

    #[test]
    fn malformed_input_file_is_a_json_error() {
        let file = input_file("{ not json");
        let args = CalcArgs {
            input: Some(file.path().to_path_buf()),
            ..CalcArgs::default()
        };
        let err = build_inputs(&args).expect_err("must fail");
        assert!(matches!(err, Error::Json(_)));
    }

    #[test]
    fn missing_input_file_reports_path() {
        let args = CalcArgs {
            input: Some(PathBuf::from("/nonexistent/don-calc.json")),
            ..CalcArgs::default()
        };
        let err = build_inputs(&args).expect_err("must fail");
        assert!(err.to_string().contains("/nonexistent/don-calc.json"));
    }

    #[test]
    fn serve_defaults() {
        let cli = Cli::try_parse_from(["don-calc", "serve", "--port", "9000"])
            .expect("arguments should parse");
        let Command::Serve(args) = cli.command else {
            panic!("expected serve command");
        };
        assert_eq!(args.port, 9000);
    }
}
