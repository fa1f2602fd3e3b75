use clap::Parser;
use kindling::config::{self, CliOverrides};
use kindling::{Document, HeadlessWindow, PrefetchMode, Router, RouterEvent, Window};
use simplelog::{ConfigBuilder, LevelFilter, WriteLogger};
use std::fs::File;
use tokio::sync::broadcast;

#[derive(Parser)]
#[command(name = "kindling", about = "Navigate a server-rendered site without full reloads")]
struct Args {
    /// Page to start from
    start_url: String,

    /// Path to navigate to, in order (repeatable)
    #[arg(short, long = "go", value_name = "PATH")]
    go: Vec<String>,

    /// Step back one history entry after the navigations
    #[arg(short, long)]
    back: bool,

    /// Prefetch strategy
    #[arg(long, value_enum)]
    prefetch: Option<PrefetchMode>,

    /// Verbose navigation logging
    #[arg(long)]
    log: bool,

    /// Wrap body swaps in view transitions
    #[arg(long)]
    transitions: bool,

    /// Print the final document instead of its title
    #[arg(long)]
    dump: bool,
}

fn print_events(rx: &mut broadcast::Receiver<RouterEvent>) {
    while let Ok(event) = rx.try_recv() {
        match event {
            RouterEvent::FetchStart => println!("  fetch started"),
            RouterEvent::FetchProgress(p) if p.length > 0 => {
                println!("  {:>6.1}%  {}/{} bytes", p.progress, p.received, p.length)
            }
            RouterEvent::FetchProgress(p) => println!("  {} bytes", p.received),
            RouterEvent::End => println!("  done"),
            RouterEvent::Error(e) => println!("  error: {e}"),
        }
    }
}

fn print_page(router: &Router<HeadlessWindow>) {
    router.with_page(|page| {
        let title = page.document.title().unwrap_or_default();
        println!("→ {} {title:?}", page.window.location());
    });
}

#[tokio::main]
async fn main() -> Result<(), Box<dyn std::error::Error>> {
    let args = Args::parse();
    dotenv::dotenv().ok();

    let file_config = config::load_config().unwrap_or_else(|e| {
        eprintln!("Ignoring config file: {e}");
        config::KindlingConfig::default()
    });
    let cli = CliOverrides {
        log: args.log.then_some(true),
        prefetch: args.prefetch,
        page_transitions: args.transitions.then_some(true),
    };
    let options = config::resolve(&file_config, &cli);

    // Initialize file logger - writes to kindling.log in current directory
    let log_config = ConfigBuilder::new().set_time_format_rfc3339().build();
    let level = if options.log {
        LevelFilter::Debug
    } else {
        LevelFilter::Info
    };
    if let Ok(log_file) = File::create("kindling.log") {
        let _ = WriteLogger::init(level, log_config, log_file);
    }

    log::info!("Kindling starting at {} with {:?}", args.start_url, options);

    let client = reqwest::Client::builder()
        .user_agent(options.user_agent.clone())
        .build()?;
    let html = client
        .get(&args.start_url)
        .send()
        .await?
        .error_for_status()?
        .text()
        .await?;

    let window = HeadlessWindow::new(&args.start_url).with_view_transitions();
    let router = Router::new(Document::parse(&html), window, options);
    let mut events = router.subscribe();
    print_page(&router);

    for path in &args.go {
        println!("go {path}");
        if let Err(e) = router.go(path).await {
            println!("  skipped: {e}");
        }
        print_events(&mut events);
        print_page(&router);
    }

    if args.back {
        println!("back");
        router.back().await;
        print_events(&mut events);
        print_page(&router);
    }

    if args.dump {
        println!("{}", router.with_page(|page| page.document.to_html()));
    }

    Ok(())
}
