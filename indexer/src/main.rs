use anyhow::Result;
use clap::{ArgGroup, Parser};
use std::path::PathBuf;
use std::time::Instant;
use tracing_subscriber::{fmt, EnvFilter};
use wordex_core::work_queue::thread_count;
use wordex_indexer::{Options, Source};

#[derive(Parser, Debug)]
#[command(name = "wordex")]
#[command(about = "Build a word-position index from text files or a web crawl and run queries against it", long_about = None)]
#[command(group(ArgGroup::new("source").args(["text", "html"])))]
struct Cli {
    /// Text file, or directory searched recursively for .txt/.text files
    #[arg(long, value_name = "PATH")]
    text: Option<PathBuf>,
    /// Seed URL to crawl (always multithreaded)
    #[arg(long, value_name = "URL")]
    html: Option<String>,
    /// Run on a worker pool; missing or invalid counts use 5 threads
    #[arg(long, value_name = "N")]
    threads: Option<Option<String>>,
    /// Maximum number of pages to crawl
    #[arg(long, default_value_t = 1)]
    max: usize,
    /// Match query words as prefixes
    #[arg(long, default_value_t = false)]
    partial: bool,
    /// Write the index as JSON [default: index.json]
    #[arg(long, value_name = "PATH")]
    index: Option<Option<PathBuf>>,
    /// Write per-location word counts as JSON [default: counts.json]
    #[arg(long, value_name = "PATH")]
    counts: Option<Option<PathBuf>>,
    /// File with one query per line
    #[arg(long, value_name = "PATH")]
    query: Option<PathBuf>,
    /// Write query results as JSON [default: results.json]
    #[arg(long, value_name = "PATH")]
    results: Option<Option<PathBuf>>,
}

fn or_default(flag: Option<Option<PathBuf>>, default: &str) -> Option<PathBuf> {
    flag.map(|path| path.unwrap_or_else(|| PathBuf::from(default)))
}

impl Cli {
    fn into_options(self) -> Options {
        let source = match (self.text, self.html) {
            (Some(path), _) => Some(Source::Text(path)),
            (None, Some(seed)) => Some(Source::Html { seed, max: self.max }),
            (None, None) => None,
        };
        Options {
            source,
            threads: self.threads.map(|raw| thread_count(raw.as_deref())),
            partial: self.partial,
            index_out: or_default(self.index, "index.json"),
            counts_out: or_default(self.counts, "counts.json"),
            queries: self.query,
            results_out: or_default(self.results, "results.json"),
        }
    }
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    tracing::debug!(?cli, "arguments");

    let started = Instant::now();
    let engine = wordex_indexer::run(&cli.into_options())?;
    engine.shutdown();
    tracing::info!(elapsed_ms = started.elapsed().as_millis() as u64, "done");
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn options(args: &[&str]) -> Options {
        Cli::try_parse_from(std::iter::once("wordex").chain(args.iter().copied()))
            .unwrap()
            .into_options()
    }

    #[test]
    fn bare_output_flags_use_default_paths() {
        let opts = options(&["--text", "input", "--index", "--counts", "--results"]);
        assert_eq!(opts.source, Some(Source::Text("input".into())));
        assert_eq!(opts.index_out, Some(PathBuf::from("index.json")));
        assert_eq!(opts.counts_out, Some(PathBuf::from("counts.json")));
        assert_eq!(opts.results_out, Some(PathBuf::from("results.json")));
        assert_eq!(opts.threads, None);
        assert_eq!(opts.worker_threads(), None);
    }

    #[test]
    fn explicit_paths_are_kept() {
        let opts = options(&["--index", "out/i.json", "--query", "q.txt", "--results", "r.json"]);
        assert_eq!(opts.index_out, Some(PathBuf::from("out/i.json")));
        assert_eq!(opts.queries, Some(PathBuf::from("q.txt")));
        assert_eq!(opts.results_out, Some(PathBuf::from("r.json")));
        assert_eq!(opts.counts_out, None);
    }

    #[test]
    fn thread_flag_falls_back_to_default() {
        assert_eq!(options(&["--threads"]).threads, Some(5));
        assert_eq!(options(&["--threads", "0"]).threads, Some(5));
        assert_eq!(options(&["--threads", "many"]).threads, Some(5));
        assert_eq!(options(&["--threads", "3"]).threads, Some(3));
    }

    #[test]
    fn html_source_is_multithreaded_with_budget() {
        let opts = options(&["--html", "https://example.com/", "--max", "20", "--partial"]);
        assert_eq!(
            opts.source,
            Some(Source::Html { seed: "https://example.com/".into(), max: 20 })
        );
        assert!(opts.partial);
        assert_eq!(opts.worker_threads(), Some(5));
    }

    #[test]
    fn text_and_html_are_exclusive() {
        let args = ["wordex", "--text", "a", "--html", "https://example.com/"];
        assert!(Cli::try_parse_from(args).is_err());
    }
}
