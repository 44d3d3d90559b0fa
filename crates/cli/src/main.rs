use anyhow::Context;
use chrono::NaiveDateTime;
use clap::{Args, Parser, Subcommand};
use std::io::Write;
use std::sync::Arc;
use syntgen_core::{
    framing, BuildOptions, CoreConfig, DemographicConstraints, GenerationRequest,
    GeneratorService, OutputFormat, Sex,
};
use syntgen_enhance::{AzureOpenAiConfig, AzureOpenAiHook};

#[derive(Parser)]
#[command(name = "syntgen")]
#[command(about = "Synthetic HealthLink HL7 v2 message generator")]
struct Cli {
    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Generate one or more messages
    Generate(GenerateArgs),
    /// List the supported message types
    Types,
}

#[derive(Args)]
struct GenerateArgs {
    /// Message type id (1-31); random when omitted
    #[arg(short = 't', long = "type")]
    type_id: Option<u32>,
    /// Output encoding: linear, nested or structured
    #[arg(short, long, default_value = "linear")]
    format: OutputFormat,
    /// Seed for reproducible output; message `n` uses `seed + n`
    #[arg(long)]
    seed: Option<u64>,
    /// Patient sex (M or F)
    #[arg(long)]
    sex: Option<Sex>,
    /// Patient age in years
    #[arg(long)]
    age: Option<u8>,
    /// Reference time, e.g. 2025-01-20T16:45:00 (default: now)
    #[arg(long, value_parser = parse_reference_time)]
    at: Option<NaiveDateTime>,
    /// Rewrite narrative fields with Azure OpenAI
    #[arg(long)]
    enhance: bool,
    /// Number of messages
    #[arg(short = 'n', long, default_value_t = 1)]
    count: u32,
    /// Print one segment per line instead of carriage returns
    #[arg(long)]
    readable: bool,
    /// Print the MLLP-framed bytes as hex
    #[arg(long, conflicts_with = "readable")]
    framed: bool,
}

fn parse_reference_time(value: &str) -> Result<NaiveDateTime, String> {
    ["%Y-%m-%dT%H:%M:%S", "%Y-%m-%d %H:%M:%S", "%Y%m%d%H%M%S"]
        .iter()
        .find_map(|fmt| NaiveDateTime::parse_from_str(value, fmt).ok())
        .ok_or_else(|| format!("'{value}' is not a date-time like 2025-01-20T16:45:00"))
}

fn service(enhance: bool) -> anyhow::Result<GeneratorService> {
    let env = |key: &str| std::env::var(key).ok();
    let service = GeneratorService::new(CoreConfig::from_env_values(env)?);
    if !enhance {
        return Ok(service);
    }

    let azure = AzureOpenAiConfig::from_env_values(
        env("AZURE_OPENAI_ENDPOINT"),
        env("AZURE_OPENAI_API_KEY"),
        env("AZURE_OPENAI_API_VERSION"),
        env("AZURE_OPENAI_DEPLOYMENT"),
    )?
    .context("--enhance needs AZURE_OPENAI_ENDPOINT and AZURE_OPENAI_API_KEY")?;
    Ok(service.with_enhancement_hook(Arc::new(AzureOpenAiHook::new(azure))))
}

fn generate(
    service: &GeneratorService,
    args: &GenerateArgs,
    out: &mut impl Write,
) -> anyhow::Result<()> {
    for n in 0..args.count {
        let request = GenerationRequest {
            type_id: args.type_id,
            format: args.format,
            options: BuildOptions {
                seed: args.seed.map(|seed| seed.wrapping_add(u64::from(n))),
                demographics: DemographicConstraints {
                    sex: args.sex,
                    age: args.age,
                },
                enhance: args.enhance,
                reference_time: args.at,
            },
        };
        let text = service.generate(&request)?.output.into_text()?;

        if n > 0 {
            writeln!(out)?;
        }
        if args.framed {
            writeln!(out, "{}", framing::frame(&text)?.to_hex())?;
        } else if args.readable {
            writeln!(out, "{}", text.replace('\r', "\n"))?;
        } else {
            writeln!(out, "{text}")?;
        }
    }
    Ok(())
}

fn types(service: &GeneratorService, out: &mut impl Write) -> anyhow::Result<()> {
    for definition in service.message_types() {
        write!(
            out,
            "{:>2}  {:<8} {}",
            definition.id,
            definition.family.tag(),
            definition.label
        )?;
        match definition.specialty {
            Some(specialty) => writeln!(out, " [{specialty}]")?,
            None => writeln!(out)?,
        }
    }
    Ok(())
}

fn run(cli: Cli, out: &mut impl Write) -> anyhow::Result<()> {
    match cli.command {
        Commands::Generate(args) => generate(&service(args.enhance)?, &args, out),
        Commands::Types => types(&service(false)?, out),
    }
}

fn main() -> anyhow::Result<()> {
    dotenvy::dotenv().ok();
    tracing_subscriber::fmt()
        .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
        .with_writer(std::io::stderr)
        .init();

    let cli = Cli::parse();
    let stdout = std::io::stdout();
    run(cli, &mut stdout.lock())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn run_args(args: &[&str]) -> anyhow::Result<String> {
        let cli = Cli::try_parse_from(args)?;
        let mut out = Vec::new();
        run(cli, &mut out)?;
        Ok(String::from_utf8(out).expect("utf-8"))
    }

    #[test]
    fn lists_types() {
        let out = run_args(&["syntgen", "types"]).expect("runs");
        assert_eq!(out.lines().count(), 31);
        assert!(out.lines().next().expect("first").contains("Laboratory Order"));
        assert!(out.contains("NEUROLOGY"));
    }

    #[test]
    fn generates_readable_linear_message() {
        let out = run_args(&[
            "syntgen", "generate", "-t", "10", "--sex", "M", "--age", "49", "--seed", "9",
            "--at", "2025-01-20T16:45:00", "--readable",
        ])
        .expect("runs");
        let lines: Vec<&str> = out.lines().collect();
        assert!(lines[0].starts_with("MSH|^~\\&|HL7SYNTGEN10|"));
        assert!(lines[0].contains("|20250120164500|"));
        assert_eq!(lines.iter().filter(|l| l.starts_with("PID|")).count(), 1);
    }

    #[test]
    fn count_with_seed_is_reproducible() {
        let args = [
            "syntgen", "generate", "-t", "3", "-n", "2", "--seed", "100", "--at",
            "20250301120000", "-f", "nested",
        ];
        let first = run_args(&args).expect("runs");
        let second = run_args(&args).expect("runs");
        assert_eq!(first, second);
        assert_eq!(first.matches("<REF_I12>").count(), 2);
    }

    #[test]
    fn framed_output_is_hex() {
        let out = run_args(&["syntgen", "generate", "-t", "13", "--framed"]).expect("runs");
        let hex = out.trim();
        assert!(hex.starts_with("0b4d5348"));
        assert!(hex.ends_with("1c0d"));
    }

    #[test]
    fn rejects_bad_arguments() {
        assert!(Cli::try_parse_from(["syntgen", "generate", "--sex", "X"]).is_err());
        assert!(Cli::try_parse_from(["syntgen", "generate", "-f", "csv"]).is_err());
        assert!(Cli::try_parse_from(["syntgen", "generate", "--at", "yesterday"]).is_err());
        assert!(run_args(&["syntgen", "generate", "-t", "32"]).is_err());
    }
}
