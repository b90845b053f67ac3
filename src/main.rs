mod cli;

use crate::cli::{Args, Command};
use clap::Parser;
use ldss_config::Config;
use ldss_library::{
    Downloader, FileManifestSource, Item, Language, Library, Message, MirrorDownloader, OfflineDownloader, Options,
    Reference, auto_download,
};
use std::process::ExitCode;
use std::sync::Arc;
use tokio::sync::mpsc;
use tracing::{debug, error};

#[tokio::main]
async fn main() -> ExitCode {
    let args = Args::parse();
    let default_level = match args.verbose {
        0 => "warn",
        1 => "debug",
        _ => "trace",
    };
    let filter = tracing_subscriber::EnvFilter::try_from_default_env()
        .unwrap_or_else(|_| tracing_subscriber::EnvFilter::new(default_level));
    tracing_subscriber::fmt().with_env_filter(filter).with_writer(std::io::stderr).init();
    debug!(?args, "CLI arguments parsed");

    let config = match Config::load(args.config.as_deref()) {
        Ok(config) => config,
        Err(err) => {
            error!(error = ?err, "Could not load configuration");
            eprintln!("error: {}", &*err);
            return ExitCode::FAILURE;
        },
    };
    let library = match open(&config) {
        Ok(library) => library,
        Err(err) => {
            eprintln!("error: {}", &*err);
            return ExitCode::FAILURE;
        },
    };
    let language = args.language.unwrap_or_else(|| library.default_language().code().to_string());

    let success = match args.command {
        Command::Lookup { path } => lookup(&library, &language, &path).await,
        Command::Search { path, keywords } => {
            search(&library, Reference::new(language, path).with_keywords(keywords)).await
        },
        Command::Footnotes { path, verses } => footnotes(&library, &language, &path, verses).await,
    };
    if success { ExitCode::SUCCESS } else { ExitCode::FAILURE }
}

fn open(config: &Config) -> ldss_library::Result<Arc<Library>> {
    let options = Options {
        data_dir: config.data_dir.clone(),
        connection_limit: config.connection_limit,
        languages: config.languages.iter().map(|lang| Language::new(lang.id, lang.code.clone(), lang.name.clone())).collect(),
        default_language: config.default_language.clone(),
        search_buffer: config.search_buffer,
    };
    let downloader: Arc<dyn Downloader> = match &config.mirror {
        Some(mirror) => Arc::new(MirrorDownloader::new(mirror)),
        None => Arc::new(OfflineDownloader),
    };
    Library::new(options, Arc::new(FileManifestSource::new(&config.data_dir)), downloader)
}

/// Report progress until the operation settles; `None` if it failed.
async fn settle<T>(mut messages: mpsc::Receiver<Message<T>>) -> Option<T> {
    while let Some(message) = messages.recv().await {
        match message {
            Message::Download(missing) => eprintln!("Downloading {}…", missing.book()),
            Message::Done(value) => return Some(value),
            Message::Error(err) => {
                debug!(error = ?err, "Operation failed");
                eprintln!("error: {}", &*err);
                return None;
            },
        }
    }
    eprintln!("error: a required book is still unavailable after downloading it");
    None
}

async fn lookup(library: &Arc<Library>, language: &str, path: &str) -> bool {
    let Some(item) = settle(library.lookup_path(language, path)).await else {
        return false;
    };
    println!("{item}");
    let children = {
        let item = item.clone();
        settle(auto_download(move || {
            let item = item.clone();
            async move { item.children().await }
        }))
        .await
    };
    let Some(children) = children else {
        return false;
    };
    for child in children {
        println!("  {} {}", child.path(), child.name());
    }
    true
}

async fn search(library: &Arc<Library>, reference: Reference) -> bool {
    let library = library.clone();
    let results = settle(auto_download(move || {
        let library = library.clone();
        let reference = reference.clone();
        async move { library.search_sorted(&reference).await }
    }))
    .await;
    let Some(results) = results else {
        return false;
    };
    if results.is_empty() {
        eprintln!("No results");
    }
    for result in results {
        println!("{result}");
    }
    true
}

async fn footnotes(library: &Arc<Library>, language: &str, path: &str, verses: Vec<u32>) -> bool {
    let Some(item) = settle(library.lookup_path(language, path)).await else {
        return false;
    };
    let Item::Node(node) = item else {
        eprintln!("error: {path} is not a chapter or section");
        return false;
    };
    let found = settle(auto_download(move || {
        let node = node.clone();
        let verses = verses.clone();
        async move { node.footnotes(&verses).await }
    }))
    .await;
    let Some(found) = found else {
        return false;
    };
    for footnote in found {
        println!("{} {}: {}", footnote.name, footnote.link_name, footnote.content);
    }
    true
}
