use anyhow::{Context, Result, anyhow};
use clap::{Arg, ArgAction, ArgMatches, Command};
use fantasy_data::{
    EndpointCatalog, HttpTransport, OperationSpec, ParamSpec, Params, ServiceClient,
};
use serde_json::Value;
use std::env;
use std::io::Write;

fn main() {
    if let Err(err) = run() {
        eprintln!("error: {err}");
        std::process::exit(1);
    }
}

fn run() -> Result<()> {
    let catalog = EndpointCatalog::builtin().context("load builtin catalog")?;
    let cli = build_cli(&catalog);
    let matches = cli.get_matches();

    if let Some(matches) = matches.subcommand_matches("list") {
        return handle_list(&catalog, matches);
    }
    if let Some(matches) = matches.subcommand_matches("describe") {
        return handle_describe(&catalog, matches);
    }
    if matches.subcommand_matches("catalog").is_some() {
        return write_json(&serde_json::to_value(&catalog)?, true);
    }

    let (op_name, op_matches) = matches
        .subcommand()
        .ok_or_else(|| anyhow!("operation required"))?;
    let op = catalog.lookup(op_name)?;
    let params = collect_params(op, op_matches)?;

    let config = load_config(&catalog, &matches)?;
    let transport =
        HttpTransport::new(config.timeout).map_err(|err| anyhow!("build http client: {err}"))?;
    let client = ServiceClient::with_transport(
        config.api_key,
        &config.subscription,
        catalog.clone(),
        transport,
    )?
    .with_base_url(config.base_url);

    if matches.get_flag("dry_run") {
        let request = client.resolve(op_name, &params)?;
        return write_stdout_line(&request.to_string());
    }

    let result = client.invoke(op_name, &params)?;
    write_json(result.value(), matches.get_flag("pretty"))
}

fn load_config(catalog: &EndpointCatalog, matches: &ArgMatches) -> Result<Config> {
    let api_key = matches
        .get_one::<String>("api_key")
        .cloned()
        .or_else(|| env::var("FANTASY_DATA_API_KEY").ok())
        .ok_or_else(|| anyhow!("FANTASY_DATA_API_KEY missing"))?;

    let subscription = matches
        .get_one::<String>("subscription")
        .cloned()
        .or_else(|| env::var("FANTASY_DATA_SUBSCRIPTION").ok())
        .unwrap_or_else(|| "developer".to_string());

    let base_url = matches
        .get_one::<String>("base_url")
        .cloned()
        .or_else(|| env::var("FANTASY_DATA_BASE_URL").ok())
        .unwrap_or_else(|| catalog.default_base_url().to_string());

    let timeout = matches.get_one::<u64>("timeout").copied();

    let level = if matches.get_flag("debug") {
        log::LevelFilter::Debug
    } else {
        log::LevelFilter::Warn
    };
    env_logger::Builder::from_env("RUST_LOG")
        .filter_level(level)
        .init();

    Ok(Config {
        api_key,
        subscription,
        base_url,
        timeout,
    })
}

fn build_cli(catalog: &EndpointCatalog) -> Command {
    let mut cmd = Command::new("fantasy-data")
        .about("FantasyData NFL API client")
        .subcommand_required(true)
        .arg_required_else_help(true)
        .arg(
            Arg::new("api_key")
                .long("api-key")
                .global(true)
                .value_name("KEY")
                .help("API key (env: FANTASY_DATA_API_KEY)"),
        )
        .arg(
            Arg::new("subscription")
                .long("subscription")
                .global(true)
                .value_name("TIER")
                .help("Subscription tier: developer|basic|premium (env: FANTASY_DATA_SUBSCRIPTION)"),
        )
        .arg(
            Arg::new("base_url")
                .long("base-url")
                .global(true)
                .value_name("URL")
                .help("API base URL (env: FANTASY_DATA_BASE_URL)"),
        )
        .arg(
            Arg::new("timeout")
                .long("timeout")
                .global(true)
                .value_name("SECONDS")
                .value_parser(clap::value_parser!(u64))
                .help("HTTP timeout in seconds"),
        )
        .arg(
            Arg::new("pretty")
                .long("pretty")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Pretty-print JSON output"),
        )
        .arg(
            Arg::new("dry_run")
                .long("dry-run")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Print the resolved request (key masked) instead of sending it"),
        )
        .arg(
            Arg::new("debug")
                .long("debug")
                .global(true)
                .action(ArgAction::SetTrue)
                .help("Enable debug logging"),
        );

    cmd = cmd.subcommand(
        Command::new("list").about("List operations").arg(
            Arg::new("json")
                .long("json")
                .action(ArgAction::SetTrue)
                .help("Emit machine-readable JSON"),
        ),
    );

    cmd = cmd.subcommand(
        Command::new("describe")
            .about("Describe a specific operation")
            .arg(Arg::new("op").required(true))
            .arg(
                Arg::new("json")
                    .long("json")
                    .action(ArgAction::SetTrue)
                    .help("Emit machine-readable JSON"),
            ),
    );

    cmd = cmd.subcommand(Command::new("catalog").about("Print the full endpoint catalog as JSON"));

    for op in catalog.operations() {
        let mut op_cmd = Command::new(op.name.clone())
            .about(op.summary.clone().unwrap_or_else(|| op.path.to_string()));
        op_cmd = op_cmd.arg(
            Arg::new("params")
                .long("params")
                .value_name("JSON")
                .help("JSON object of parameters"),
        );
        for param in &op.params {
            op_cmd = op_cmd.arg(build_param_arg(param));
        }
        cmd = cmd.subcommand(op_cmd);
    }

    cmd
}

fn param_key(param: &ParamSpec) -> String {
    format!("param__{}", param.name)
}

fn build_param_arg(param: &ParamSpec) -> Arg {
    let mut arg = Arg::new(param_key(param))
        .long(param.name.to_ascii_lowercase())
        .value_name(param.name.to_ascii_uppercase());
    if !param.allowed.is_empty() {
        arg = arg.help(param.allowed.join("|"));
    }
    arg
}

fn collect_params(op: &OperationSpec, matches: &ArgMatches) -> Result<Params> {
    let mut params = match matches.get_one::<String>("params") {
        Some(raw) => json_object_to_string_map(raw, "--params")?,
        None => Params::new(),
    };
    for param in &op.params {
        if let Some(value) = matches.get_one::<String>(&param_key(param)) {
            params.insert(param.name.clone(), value.clone());
        }
    }
    Ok(params)
}

fn handle_list(catalog: &EndpointCatalog, matches: &ArgMatches) -> Result<()> {
    if matches.get_flag("json") {
        let names: Vec<&str> = catalog.names().collect();
        return write_json(&serde_json::to_value(names)?, true);
    }

    for op in catalog.operations() {
        match &op.summary {
            Some(summary) => write_stdout_line(&format!("{:<24}{}", op.name, summary))?,
            None => write_stdout_line(&op.name)?,
        }
    }
    Ok(())
}

fn handle_describe(catalog: &EndpointCatalog, matches: &ArgMatches) -> Result<()> {
    let op_name = matches
        .get_one::<String>("op")
        .ok_or_else(|| anyhow!("operation required"))?;
    let op = catalog.lookup(op_name)?;

    if matches.get_flag("json") {
        return write_json(&serde_json::to_value(op)?, true);
    }

    write_stdout_line(&op.name)?;
    write_stdout_line(&format!("  method: {}", op.method))?;
    write_stdout_line(&format!("  path: {}/{}", catalog.root(), op.path))?;
    write_stdout_line(&format!("  response: {:?}", op.response))?;
    if !op.params.is_empty() {
        write_stdout_line("  params:")?;
        for param in &op.params {
            let mut line = format!(
                "    --{}  {:?}  ({:?})",
                param.name.to_ascii_lowercase(),
                param.param_type,
                param.location
            );
            if param.required {
                line.push_str("  required");
            }
            if let Some(default) = &param.default {
                line.push_str(&format!("  default={default}"));
            }
            write_stdout_line(&line)?;
        }
    }
    Ok(())
}

fn json_object_to_string_map(raw: &str, flag: &str) -> Result<Params> {
    let value: Value =
        serde_json::from_str(raw).with_context(|| format!("invalid JSON for {flag}"))?;
    let Value::Object(map) = value else {
        return Err(anyhow!("{flag} must be a JSON object"));
    };
    let mut out = Params::new();
    for (k, v) in map {
        let value = match v {
            Value::String(v) => v,
            other => serde_json::to_string(&other)?,
        };
        out.insert(k, value);
    }
    Ok(out)
}

fn write_json(value: &Value, pretty: bool) -> Result<()> {
    if pretty {
        write_stdout_line(&serde_json::to_string_pretty(value)?)
    } else {
        write_stdout_line(&serde_json::to_string(value)?)
    }
}

fn write_stdout_line(value: &str) -> Result<()> {
    let mut out = std::io::stdout().lock();
    if let Err(err) = out.write_all(value.as_bytes()) {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        return Err(err.into());
    }
    if let Err(err) = out.write_all(b"\n") {
        if err.kind() == std::io::ErrorKind::BrokenPipe {
            std::process::exit(0);
        }
        return Err(err.into());
    }
    Ok(())
}

struct Config {
    api_key: String,
    subscription: String,
    base_url: String,
    timeout: Option<u64>,
}
