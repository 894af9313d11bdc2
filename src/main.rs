#![deny(warnings)]

use anyhow::{anyhow, Context, Error};
use argh::FromArgs;
use clipsweep::{Browser, ClipEntry, FuzzyMatcher, MatcherOptions, RankOptions, RankedSearch};
use std::{fs::File, io::Read};

#[global_allocator]
static GLOBAL: mimalloc::MiMalloc = mimalloc::MiMalloc;

fn main() -> Result<(), Error> {
    let args: Args = argh::from_env();

    if args.version {
        println!("clipsweep {}", env!("CARGO_PKG_VERSION"));
        return Ok(());
    }

    if args.debug {
        tracing_subscriber::fmt()
            .with_ansi(false)
            .with_env_filter(tracing_subscriber::EnvFilter::from_default_env())
            .init();
    }

    let pattern = args
        .pattern
        .as_deref()
        .ok_or_else(|| anyhow!("pattern is required"))?;

    let mut input = String::new();
    match args.input.as_deref() {
        Some("-") | None => {
            std::io::stdin()
                .read_to_string(&mut input)
                .context("failed to read stdin")?;
        }
        Some(path) => {
            File::open(path)
                .with_context(|| format!("failed to open {}", path))?
                .read_to_string(&mut input)
                .context("failed to read input file")?;
        }
    }
    let entries: Vec<ClipEntry> =
        serde_json::from_str(&input).context("input must be a JSON array of entries")?;

    let matcher = FuzzyMatcher::new(MatcherOptions {
        pre: args.pre.clone(),
        post: args.post.clone(),
        case_sensitive: args.case_sensitive,
        max_distance: args.max_distance,
        escape_markup: args.escape_markup,
    });
    let browser = Browser::new(RankedSearch::new(
        matcher,
        RankOptions {
            max_results: args.max_results,
        },
    ));
    browser.set_entries(entries);

    if !browser.search(pattern) {
        return Err(anyhow!("pattern can not be blank"));
    }
    for entry in browser.model().items() {
        println!("{}", entry.text);
    }
    Ok(())
}

/// Rank clipboard-history entries against a fuzzy pattern
#[derive(FromArgs)]
pub struct Args {
    /// fuzzy pattern to rank entries by
    #[argh(positional)]
    pub pattern: Option<String>,

    /// path to a JSON array of entries, "-" or omitted reads stdin
    #[argh(option, short = 'i')]
    pub input: Option<String>,

    /// marker inserted before every matched character
    #[argh(option, default = "\"[\".to_string()")]
    pub pre: String,

    /// marker inserted after every matched character
    #[argh(option, default = "\"]\".to_string()")]
    pub post: String,

    /// maximum number of results shown, 0 keeps everything
    #[argh(option, short = 'n', default = "0")]
    pub max_results: usize,

    /// maximum gap between matched characters before a candidate is dropped
    #[argh(option, default = "30")]
    pub max_distance: usize,

    /// match case sensitively
    #[argh(switch, short = 's')]
    pub case_sensitive: bool,

    /// escape markup characters in the output
    #[argh(switch)]
    pub escape_markup: bool,

    /// enable debug logging, RUST_LOG controls the filter
    #[argh(switch)]
    pub debug: bool,

    /// show version and quit
    #[argh(switch)]
    pub version: bool,
}
