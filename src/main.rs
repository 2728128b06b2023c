use anyhow::{anyhow, bail, Result};
use reqwest::Client;
use sitejoin::{
    resolve::{self, AdminState, IpLookup, Report, SiteCode},
    schema::{Row, SchemaSet, TableSchema},
    store::Store,
};
use tracing::info;
use tracing_subscriber::{fmt, EnvFilter};

const SCHEMA_FILE: &str = "sitejoin.yaml";

#[tokio::main]
async fn main() -> Result<()> {
    // ─── 1) init logging ─────────────────────────────────────────────
    let env = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info"));
    fmt::Subscriber::builder().with_env_filter(env).init();

    // ─── 2) args + schema config ─────────────────────────────────────
    let (base, codes) = parse_args()?;
    let schemas = SchemaSet::load_or_default(SCHEMA_FILE)?;

    // ─── 3) load all five datasets ───────────────────────────────────
    let client = Client::new();
    info!(base = %base, "loading datasets");
    let store = Store::load(&client, &base, schemas).await?;

    // ─── 4) resolve each requested code ──────────────────────────────
    for raw in codes {
        match SiteCode::parse(&raw) {
            Ok(code) => print_report(&store, &resolve::report(&store, &code)),
            Err(e) => eprintln!("{}", e),
        }
    }

    Ok(())
}

fn parse_args() -> Result<(String, Vec<String>)> {
    let mut base = ".".to_string();
    let mut codes = Vec::new();
    let mut args = std::env::args().skip(1);
    while let Some(arg) = args.next() {
        match arg.as_str() {
            "-d" | "--data" => {
                base = args.next().ok_or_else(|| anyhow!("--data needs a value"))?;
            }
            _ => codes.push(arg),
        }
    }
    if codes.is_empty() {
        bail!("usage: sitejoin [--data <dir-or-url>] <code> [<code>...]");
    }
    Ok((base, codes))
}

fn print_report(store: &Store, report: &Report) {
    println!("== {} ==", report.code);
    match &report.ip {
        IpLookup::Resolved { ip, url } => println!("ip: {}  url: {}", ip, url),
        IpLookup::Invalid { raw } => println!("ip: found but invalid ({:?})", raw),
        IpLookup::NotFound => println!("ip: no match in sites"),
    }

    let schemas = store.schemas();
    print_rows("lncel", &schemas.lncel, report.cells, |_| "");
    print_rows("config 2g", &schemas.config_2g, report.config, |row| {
        match resolve::admin_state(store, row) {
            AdminState::Up => "  [up]",
            AdminState::Down => "  [down]",
            AdminState::Unknown => "",
        }
    });

    if report.antenna.is_empty() {
        println!("antenna: no rows");
    } else {
        println!("antenna:");
        for (idx, row) in report.antenna.iter().enumerate() {
            println!(
                "  {:>2}  x={}  ant={}  rmod={}  rmod_type={}  sfp={}  len={}",
                idx + 1,
                row.x,
                row.antennas,
                row.rmod_numbers,
                row.rmod_types,
                row.sfp_capacity,
                row.sfp_length
            );
        }
    }
    println!();
}

fn print_rows(label: &str, schema: &TableSchema, rows: &[Row], suffix: impl Fn(&Row) -> &'static str) {
    if rows.is_empty() {
        println!("{}: no rows", label);
        return;
    }
    let names: Vec<&str> = schema.columns.iter().map(|c| c.name.as_str()).collect();
    println!("{} ({}):", label, names.join(" | "));
    for (idx, row) in rows.iter().enumerate() {
        println!(
            "  {:>2}  {}{}",
            idx + 1,
            row.values().join(" | "),
            suffix(row)
        );
    }
}
