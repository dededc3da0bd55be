// Copyright 2026 Phillip Cloud
// Licensed under the Apache License, Version 2.0

mod config;
mod runtime;

use anyhow::{Context, Result, anyhow, bail};
use bizsuite_app::{DocumentType, LookupEndpoint, PaymentStatus};
use config::Config;
use std::env;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

fn main() {
    if let Err(error) = run() {
        eprintln!("{error:#}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let options = parse_cli_args(env::args().skip(1), Config::default_path()?)?;

    if options.show_help {
        print_help();
        return Ok(());
    }

    if options.print_config_path {
        println!("{}", options.config_path.display());
        return Ok(());
    }

    if options.print_example {
        println!("{}", Config::example_config(&options.config_path));
        return Ok(());
    }

    let config = Config::load(&options.config_path).with_context(|| {
        format!(
            "load config {}; run with --print-example-config for a template",
            options.config_path.display()
        )
    })?;

    if options.check_only {
        println!("config ok: {}", options.config_path.display());
        return Ok(());
    }

    init_tracing(config.log_level());

    let Some(command) = options.command else {
        print_help();
        bail!("no command given");
    };
    runtime::execute(&config, &command, &mut std::io::stdout().lock())
}

/// `RUST_LOG` wins over `[log] level`. Logs go to stderr so command output
/// stays pipeable.
fn init_tracing(level: &str) {
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(level));
    let _ = tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .try_init();
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteLine {
    pub rate: f64,
    pub quantity: u32,
    pub tax_percent: f64,
}

#[derive(Debug, Clone, PartialEq)]
pub struct QuoteArgs {
    pub lines: Vec<QuoteLine>,
    pub discount: f64,
    pub flat: bool,
}

#[derive(Debug, Clone, PartialEq)]
pub enum Command {
    Lookup {
        endpoint: LookupEndpoint,
        term: Option<String>,
    },
    Batches {
        item_id: String,
    },
    Quote(QuoteArgs),
    Orders {
        term: Option<String>,
        document_type: Option<DocumentType>,
        page: usize,
    },
    PaymentStatus {
        number: String,
        status: PaymentStatus,
        amount: Option<f64>,
    },
    Notifications,
    Chat {
        message: String,
    },
}

impl Command {
    pub fn name(&self) -> &'static str {
        match self {
            Self::Lookup { .. } => "lookup",
            Self::Batches { .. } => "batches",
            Self::Quote(_) => "quote",
            Self::Orders { .. } => "orders",
            Self::PaymentStatus { .. } => "payment-status",
            Self::Notifications => "notifications",
            Self::Chat { .. } => "chat",
        }
    }
}

#[derive(Debug, Clone, PartialEq)]
struct CliOptions {
    config_path: PathBuf,
    print_config_path: bool,
    print_example: bool,
    check_only: bool,
    show_help: bool,
    command: Option<Command>,
}

fn parse_cli_args<I, S>(args: I, default_config_path: PathBuf) -> Result<CliOptions>
where
    I: IntoIterator<Item = S>,
    S: Into<String>,
{
    let mut options = CliOptions {
        config_path: default_config_path,
        print_config_path: false,
        print_example: false,
        check_only: false,
        show_help: false,
        command: None,
    };

    let mut args = args.into_iter().map(Into::into);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--config" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--config requires a file path"))?;
                options.config_path = PathBuf::from(value);
            }
            "--print-config-path" => options.print_config_path = true,
            "--print-example-config" => options.print_example = true,
            "--check" => options.check_only = true,
            "--help" | "-h" => options.show_help = true,
            unknown if unknown.starts_with('-') => {
                bail!("unknown argument {unknown:?}; run with --help to see supported options")
            }
            name => {
                let rest: Vec<String> = args.by_ref().collect();
                options.command = Some(parse_command(name, rest)?);
            }
        }
    }

    Ok(options)
}

fn parse_command(name: &str, args: Vec<String>) -> Result<Command> {
    match name {
        "lookup" => {
            let mut args = args.into_iter();
            let entity = args
                .next()
                .ok_or_else(|| anyhow!("lookup requires an entity: {}", endpoint_names()))?;
            let endpoint = LookupEndpoint::parse(&entity).ok_or_else(|| {
                anyhow!("unknown entity {entity:?}; expected one of: {}", endpoint_names())
            })?;
            let term = join_words(args);
            Ok(Command::Lookup { endpoint, term })
        }
        "batches" => {
            let [item_id] = <[String; 1]>::try_from(args)
                .map_err(|_| anyhow!("batches requires exactly one item id"))?;
            Ok(Command::Batches { item_id })
        }
        "quote" => parse_quote(args).map(Command::Quote),
        "orders" => parse_orders(args),
        "payment-status" => parse_payment_status(args),
        "notifications" => {
            if let Some(extra) = args.first() {
                bail!("notifications takes no arguments, got {extra:?}");
            }
            Ok(Command::Notifications)
        }
        "chat" => {
            let message = join_words(args).ok_or_else(|| anyhow!("chat requires a message"))?;
            Ok(Command::Chat { message })
        }
        unknown => {
            bail!("unknown command {unknown:?}; run with --help to see supported commands")
        }
    }
}

fn parse_quote(args: Vec<String>) -> Result<QuoteArgs> {
    let mut quote = QuoteArgs {
        lines: Vec::new(),
        discount: 0.0,
        flat: false,
    };

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--item" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--item requires <rate>:<qty>:<tax>"))?;
                quote.lines.push(parse_quote_line(&value)?);
            }
            "--discount" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--discount requires a number"))?;
                quote.discount = parse_number("--discount", &value)?;
            }
            "--flat" => quote.flat = true,
            unknown => bail!("unknown quote argument {unknown:?}"),
        }
    }

    if quote.lines.is_empty() {
        bail!("quote needs at least one --item <rate>:<qty>:<tax>");
    }
    Ok(quote)
}

fn parse_quote_line(raw: &str) -> Result<QuoteLine> {
    let parts: Vec<&str> = raw.split(':').collect();
    let [rate, quantity, tax] = parts.as_slice() else {
        bail!("invalid --item {raw:?}; expected <rate>:<qty>:<tax>, for example 100:3:18");
    };
    let quantity: u32 = quantity
        .trim()
        .parse()
        .with_context(|| format!("invalid quantity in --item {raw:?}"))?;
    Ok(QuoteLine {
        rate: parse_number("rate", rate)?,
        quantity: quantity.max(1),
        tax_percent: parse_number("tax", tax)?,
    })
}

fn parse_orders(args: Vec<String>) -> Result<Command> {
    let mut words = Vec::new();
    let mut document_type = None;
    let mut page = 1;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "--type" => {
                let value = args.next().ok_or_else(|| {
                    anyhow!("--type requires one of: sale, purchase, delivery_challan")
                })?;
                document_type = Some(parse_document_type(&value)?);
            }
            "--page" => {
                let value = args
                    .next()
                    .ok_or_else(|| anyhow!("--page requires a page number"))?;
                page = value
                    .parse::<usize>()
                    .with_context(|| format!("invalid page {value:?}"))?
                    .max(1);
            }
            flag if flag.starts_with("--") => bail!("unknown orders argument {flag:?}"),
            _ => words.push(arg),
        }
    }

    Ok(Command::Orders {
        term: join_words(words),
        document_type,
        page,
    })
}

fn parse_document_type(value: &str) -> Result<DocumentType> {
    match value {
        "sale" => Ok(DocumentType::SalesInvoice),
        "purchase" => Ok(DocumentType::Purchase),
        other => DocumentType::parse(other).ok_or_else(|| {
            anyhow!("unknown order type {other:?}; expected sale, purchase, or delivery_challan")
        }),
    }
}

fn parse_payment_status(args: Vec<String>) -> Result<Command> {
    let mut positional = Vec::new();
    let mut amount = None;

    let mut args = args.into_iter();
    while let Some(arg) = args.next() {
        if arg == "--amount" {
            let value = args
                .next()
                .ok_or_else(|| anyhow!("--amount requires a number"))?;
            amount = Some(parse_number("--amount", &value)?);
        } else {
            positional.push(arg);
        }
    }

    let [number, status] = <[String; 2]>::try_from(positional)
        .map_err(|_| anyhow!("payment-status requires <number> <pending|partial|paid>"))?;
    let status = PaymentStatus::parse(&status).ok_or_else(|| {
        anyhow!("unknown payment status {status:?}; expected pending, partial, or paid")
    })?;
    Ok(Command::PaymentStatus {
        number,
        status,
        amount,
    })
}

fn parse_number(label: &str, raw: &str) -> Result<f64> {
    let value: f64 = raw
        .trim()
        .parse()
        .with_context(|| format!("invalid {label} {raw:?}"))?;
    if !value.is_finite() || value < 0.0 {
        bail!("{label} must be a non-negative number, got {raw:?}");
    }
    Ok(value)
}

fn join_words<I: IntoIterator<Item = String>>(words: I) -> Option<String> {
    let joined = words.into_iter().collect::<Vec<_>>().join(" ");
    let trimmed = joined.trim();
    (!trimmed.is_empty()).then(|| trimmed.to_owned())
}

fn endpoint_names() -> String {
    LookupEndpoint::ALL
        .iter()
        .map(|endpoint| endpoint.as_str())
        .collect::<Vec<_>>()
        .join(", ")
}

fn print_help() {
    println!("bizsuite - business suite client");
    println!();
    println!("Usage:");
    println!("  bizsuite [--config <path>] <command> [args]");
    println!("  bizsuite --check");
    println!("  bizsuite --print-config-path");
    println!("  bizsuite --print-example-config");
    println!();
    println!("Commands:");
    println!("  lookup <clients|suppliers|inventory|employees> [term]");
    println!("                             List or search a dropdown");
    println!("  batches <item-id>          List batches for an inventory item");
    println!("  quote --item <rate>:<qty>:<tax> ... [--discount N] [--flat]");
    println!("                             Compute order totals offline");
    println!("  orders [term] [--type sale|purchase|delivery_challan] [--page N]");
    println!("  payment-status <number> <pending|partial|paid> [--amount N]");
    println!("  notifications              Show recent backend activity");
    println!("  chat <message>             Ask the business assistant");
    println!();
    println!("Options:");
    println!("  --config <path>            Use a specific config file");
    println!("  --check                    Validate config and exit");
    println!("  --print-config-path        Print resolved config path and exit");
    println!("  --print-example-config     Print a config template and exit");
    println!("  -h, --help                 Show this help");
    println!();
    println!("Environment:");
    println!("  BIZSUITE_CONFIG_PATH       Config file location");
    println!("  BIZSUITE_API_URL           Backend base URL, overrides [api] base_url");
    println!("  RUST_LOG                   Log filter, overrides [log] level");
}

#[cfg(test)]
mod tests {
    use super::{CliOptions, Command, QuoteArgs, QuoteLine, parse_cli_args};
    use anyhow::Result;
    use bizsuite_app::{DocumentType, LookupEndpoint, PaymentStatus};
    use std::path::PathBuf;

    fn default_options_path() -> PathBuf {
        PathBuf::from("/tmp/bizsuite-test-config.toml")
    }

    fn command(args: &[&str]) -> Result<Option<Command>> {
        Ok(parse_cli_args(args.to_vec(), default_options_path())?.command)
    }

    #[test]
    fn parse_cli_args_defaults_without_flags() -> Result<()> {
        let options = parse_cli_args(Vec::<String>::new(), default_options_path())?;
        assert_eq!(
            options,
            CliOptions {
                config_path: default_options_path(),
                print_config_path: false,
                print_example: false,
                check_only: false,
                show_help: false,
                command: None,
            }
        );
        Ok(())
    }

    #[test]
    fn parse_cli_args_sets_config_path_override() -> Result<()> {
        let options = parse_cli_args(
            vec!["--config", "/custom/config.toml", "notifications"],
            default_options_path(),
        )?;
        assert_eq!(options.config_path, PathBuf::from("/custom/config.toml"));
        assert_eq!(options.command, Some(Command::Notifications));
        Ok(())
    }

    #[test]
    fn parse_cli_args_errors_for_missing_config_value() {
        let error = parse_cli_args(vec!["--config"], default_options_path())
            .expect_err("missing config value should fail");
        assert!(error.to_string().contains("--config requires a file path"));
    }

    #[test]
    fn parse_cli_args_errors_for_unknown_argument() {
        let error = parse_cli_args(vec!["--wat"], default_options_path())
            .expect_err("unknown arg should fail");
        let message = error.to_string();
        assert!(message.contains("unknown argument"));
        assert!(message.contains("--help"));
    }

    #[test]
    fn parse_cli_args_sets_print_check_and_help_flags() -> Result<()> {
        let options = parse_cli_args(
            vec!["--print-config-path", "--print-example-config", "--check", "-h"],
            default_options_path(),
        )?;
        assert!(options.print_config_path);
        assert!(options.print_example);
        assert!(options.check_only);
        assert!(options.show_help);
        Ok(())
    }

    #[test]
    fn lookup_joins_the_remaining_words_into_a_term() -> Result<()> {
        assert_eq!(
            command(&["lookup", "inventory", "blood", "tubing"])?,
            Some(Command::Lookup {
                endpoint: LookupEndpoint::Inventory,
                term: Some("blood tubing".to_owned()),
            })
        );
        assert_eq!(
            command(&["lookup", "employees"])?,
            Some(Command::Lookup {
                endpoint: LookupEndpoint::Employees,
                term: None,
            })
        );
        assert!(command(&["lookup", "vendors"]).is_err());
        Ok(())
    }

    #[test]
    fn quote_collects_items_and_discount() -> Result<()> {
        assert_eq!(
            command(&["quote", "--item", "100:3:18", "--item", "12.5:2:0", "--discount", "50", "--flat"])?,
            Some(Command::Quote(QuoteArgs {
                lines: vec![
                    QuoteLine {
                        rate: 100.0,
                        quantity: 3,
                        tax_percent: 18.0,
                    },
                    QuoteLine {
                        rate: 12.5,
                        quantity: 2,
                        tax_percent: 0.0,
                    },
                ],
                discount: 50.0,
                flat: true,
            }))
        );
        assert!(command(&["quote"]).is_err());
        assert!(command(&["quote", "--item", "100:3"]).is_err());
        assert!(command(&["quote", "--item", "-5:1:0"]).is_err());
        Ok(())
    }

    #[test]
    fn orders_accepts_term_type_and_page_in_any_order() -> Result<()> {
        assert_eq!(
            command(&["orders", "--page", "3", "city", "--type", "delivery_challan", "hospital"])?,
            Some(Command::Orders {
                term: Some("city hospital".to_owned()),
                document_type: Some(DocumentType::DeliveryChallan),
                page: 3,
            })
        );
        assert_eq!(
            command(&["orders", "--type", "sale"])?,
            Some(Command::Orders {
                term: None,
                document_type: Some(DocumentType::SalesInvoice),
                page: 1,
            })
        );
        assert!(command(&["orders", "--type", "refund"]).is_err());
        Ok(())
    }

    #[test]
    fn payment_status_requires_number_and_known_status() -> Result<()> {
        assert_eq!(
            command(&["payment-status", "INV-1001", "partial", "--amount", "250"])?,
            Some(Command::PaymentStatus {
                number: "INV-1001".to_owned(),
                status: PaymentStatus::Partial,
                amount: Some(250.0),
            })
        );
        assert!(command(&["payment-status", "INV-1001"]).is_err());
        assert!(command(&["payment-status", "INV-1001", "overdue"]).is_err());
        Ok(())
    }

    #[test]
    fn chat_and_batches_validate_their_arguments() -> Result<()> {
        assert_eq!(
            command(&["chat", "stock", "of", "needles?"])?,
            Some(Command::Chat {
                message: "stock of needles?".to_owned(),
            })
        );
        assert!(command(&["chat"]).is_err());
        assert!(command(&["batches"]).is_err());
        assert!(command(&["nope"]).is_err());
        Ok(())
    }
}
