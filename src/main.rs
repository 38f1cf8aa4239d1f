extern crate sapconn;

use std::env;
use std::process;

use sapconn::{Command, Connection, ConnectorError, DestinationCatalog, NwrfcGateway, RfcValue};

fn run(config_path: &str, destination: Option<&str>) -> sapconn::Result<()> {
    let catalog = DestinationCatalog::from_path(config_path)?;

    // Open the rfc dll or .so
    let gateway = NwrfcGateway::load()?;

    let mut conn = Connection::from_catalog(&gateway, &catalog, destination)?;
    conn.open()?;

    log::info!("Fetching user names from {}...", conn.config_name());

    // The field we are interested in is called BNAME.
    // Tell this to the RFC_READ_TABLE function.
    let fields = RfcValue::Table(vec![vec![(
        "FIELDNAME".to_string(),
        RfcValue::from("BNAME"),
    )]]);
    let cmd = Command::with_connection("RFC_READ_TABLE", &conn)
        .parameter("QUERY_TABLE", "USR02")
        .parameter("FIELDS", fields);

    let mut reader = cmd.execute_reader(Some("DATA"))?;
    log::info!(
        "Response from SAP has arrived: {} users.",
        reader.row_count()
    );
    while reader.read()? {
        if let Some(row) = reader.item() {
            let wa = row.value_by_name("WA")?;
            println!("Username: {}", wa.to_string().trim_end());
        }
    }

    conn.close();
    Ok(())
}

fn main() {
    env_logger::Builder::from_env(env_logger::Env::default().default_filter_or("info")).init();

    let args: Vec<String> = env::args().collect();
    if args.len() < 2 {
        eprintln!("usage: {} <destinations.json> [DESTINATION]", args[0]);
        process::exit(2);
    }

    if let Err(e) = run(&args[1], args.get(2).map(String::as_str)) {
        log::error!("{}", e);
        let mut cause = std::error::Error::source(&e);
        while let Some(c) = cause {
            log::error!("  caused by: {}", c);
            cause = c.source();
        }
        if let ConnectorError::LibraryLoad { .. } = e {
            eprintln!("Is the SAP NW RFC SDK on the library search path?");
        }
        process::exit(1);
    }
}
