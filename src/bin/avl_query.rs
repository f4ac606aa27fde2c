//! Batch drivers over [`AvlMultiset`]: range counting, rank/select queries, and generators for
//! their test data.
//!
//! Input is a stream of whitespace-separated integers on stdin; answers are written to stdout
//! space-separated, followed by a newline.

use std::{
    collections::BTreeSet,
    fmt::Display,
    fs::File,
    io::{self, BufWriter, Read, Write},
    path::{Path, PathBuf},
    str::FromStr,
    time::Instant,
};

use anyhow::{bail, ensure, Context, Result};
use avl_rank::AvlMultiset;
use clap::{Parser, Subcommand};
use rand::{rngs::StdRng, Rng, SeedableRng};
use tracing::{debug, info, warn};

#[derive(Parser, Debug)]
#[command(author, version, about)]
struct Args {
    #[command(subcommand)]
    command: Command,
}

#[derive(Subcommand, Debug)]
enum Command {
    /// Reads keys and `lo hi` pairs, printing how many keys fall inside each closed range.
    Range {
        /// Report build-up and query wall times on stderr instead of the answers.
        #[arg(long, env = "AVL_QUERY_TIME")]
        time: bool,

        /// Answer with `BTreeSet` range iteration instead of rank queries.
        #[arg(long, env = "AVL_QUERY_REFERENCE")]
        reference: bool,
    },

    /// Reads keys, then a batch of 1-based ranks and a batch of keys, printing the value at each
    /// rank followed by the number of keys below each key.
    Order {
        /// Report build-up and query wall times on stderr instead of the answers.
        #[arg(long, env = "AVL_QUERY_TIME")]
        time: bool,
    },

    /// Writes `<output>.dat` input for `range` and its expected answers to `<output>.ans`.
    GenRange {
        #[arg(long)]
        keys: usize,
        #[arg(long)]
        key_max: i64,
        #[arg(long)]
        queries: usize,
        #[arg(long)]
        output: PathBuf,
        /// Seed for reproducible output; drawn from the OS when absent.
        #[arg(long, env = "AVL_QUERY_SEED")]
        seed: Option<u64>,
    },

    /// Writes `<output>.dat` input for `order` and its expected answers to `<output>.ans`.
    GenOrder {
        #[arg(long)]
        keys: usize,
        #[arg(long)]
        nth_queries: usize,
        #[arg(long)]
        order_queries: usize,
        #[arg(long)]
        key_max: i64,
        #[arg(long)]
        output: PathBuf,
        /// Seed for reproducible output; drawn from the OS when absent.
        #[arg(long, env = "AVL_QUERY_SEED")]
        seed: Option<u64>,
    },
}

fn main() -> Result<()> {
    {
        use tracing_subscriber::{filter::EnvFilter, fmt, prelude::*};

        let filter = EnvFilter::try_from_env("AVL_QUERY_LOG")
            .or_else(|_| EnvFilter::try_new("warn"))
            .context("invalid log filter")?;
        tracing_subscriber::registry()
            .with(filter)
            .with(fmt::layer().with_writer(io::stderr))
            .init();
    }

    match Args::parse().command {
        Command::Range { time, reference } => range(time, reference),
        Command::Order { time } => order(time),
        Command::GenRange {
            keys,
            key_max,
            queries,
            output,
            seed,
        } => gen_range(keys, key_max, queries, &output, rng(seed)),
        Command::GenOrder {
            keys,
            nth_queries,
            order_queries,
            key_max,
            output,
            seed,
        } => gen_order(keys, nth_queries, order_queries, key_max, &output, rng(seed)),
    }
}

fn rng(seed: Option<u64>) -> StdRng {
    match seed {
        Some(seed) => StdRng::seed_from_u64(seed),
        None => StdRng::from_entropy(),
    }
}

/// Whitespace-separated values read from stdin.
struct Tokens {
    input: String,
    pos: usize,
}

impl Tokens {
    fn from_stdin() -> Result<Self> {
        let mut input = String::new();
        io::stdin()
            .read_to_string(&mut input)
            .context("failed to read stdin")?;
        Ok(Tokens { input, pos: 0 })
    }

    fn next<T>(&mut self, what: &str) -> Result<T>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let rest = &self.input[self.pos..];
        let start = rest.len() - rest.trim_start().len();
        let rest = &rest[start..];
        let len = rest.find(char::is_whitespace).unwrap_or(rest.len());
        let token = &rest[..len];
        self.pos += start + len;

        if token.is_empty() {
            bail!("unexpected end of input, expected {what}");
        }

        token
            .parse()
            .with_context(|| format!("failed to parse {what} from {token:?}"))
    }

    fn batch<T>(&mut self, what: &str) -> Result<Vec<T>>
    where
        T: FromStr,
        T::Err: std::error::Error + Send + Sync + 'static,
    {
        let n: usize = self.next("batch length")?;
        (0..n).map(|_| self.next(what)).collect()
    }
}

fn write_line<W, I>(mut w: W, values: I) -> io::Result<()>
where
    W: Write,
    I: IntoIterator,
    I::Item: Display,
{
    for value in values {
        write!(w, "{value} ")?;
    }
    writeln!(w)
}

fn range(time: bool, reference: bool) -> Result<()> {
    let mut tokens = Tokens::from_stdin()?;
    let keys: Vec<i64> = tokens.batch("key")?;

    let n_queries: usize = tokens.next("query count")?;
    let queries = (0..n_queries)
        .map(|i| -> Result<(i64, i64)> {
            let lo: i64 = tokens.next("range lower bound")?;
            let hi: i64 = tokens.next("range upper bound")?;
            ensure!(lo <= hi, "query {i}: lower bound {lo} exceeds upper bound {hi}");
            Ok((lo, hi))
        })
        .collect::<Result<Vec<_>>>()?;
    debug!(keys = keys.len(), queries = queries.len(), "input read");

    let buildup = Instant::now();
    let (answers, built, queried) = if reference {
        let set: BTreeSet<i64> = keys.iter().copied().collect();
        if set.len() != keys.len() {
            warn!(
                dropped = keys.len() - set.len(),
                "reference set ignores repeated keys"
            );
        }
        let built = buildup.elapsed();

        let start = Instant::now();
        let answers = queries
            .iter()
            .map(|&(lo, hi)| set.range(lo..=hi).count())
            .collect::<Vec<_>>();
        (answers, built, start.elapsed())
    } else {
        let set: AvlMultiset<i64> = keys.iter().copied().collect();
        let built = buildup.elapsed();

        let start = Instant::now();
        let answers = queries
            .iter()
            .map(|(lo, hi)| set.range_query(lo, hi))
            .collect::<Result<Vec<_>, _>>()?;
        (answers, built, start.elapsed())
    };
    info!(?built, ?queried, reference, "range queries answered");

    if time {
        eprintln!("Build-up time, s:\n{}", built.as_secs_f64());
        eprintln!("Queries time, s:\n{}", queried.as_secs_f64());
        return Ok(());
    }

    let mut out = BufWriter::new(io::stdout().lock());
    write_line(&mut out, answers)?;
    out.flush().context("failed to write answers")
}

fn order(time: bool) -> Result<()> {
    let mut tokens = Tokens::from_stdin()?;
    let keys: Vec<i64> = tokens.batch("key")?;

    let buildup = Instant::now();
    let set: AvlMultiset<i64> = keys.into_iter().collect();
    let built = buildup.elapsed();

    let ranks: Vec<usize> = tokens.batch("rank")?;
    let start = Instant::now();
    let values = ranks
        .iter()
        .map(|&k| {
            set.get_nth(k)
                .map(|node| *node.value())
                .with_context(|| format!("rank {k} is outside 1..={}", set.len()))
        })
        .collect::<Result<Vec<_>>>()?;
    let selected = start.elapsed();

    let probes: Vec<i64> = tokens.batch("key")?;
    let start = Instant::now();
    let orders = probes.iter().map(|key| set.order(key)).collect::<Vec<_>>();
    let ranked = start.elapsed();

    info!(?built, ?selected, ?ranked, "order queries answered");

    if time {
        eprintln!("{}", built.as_secs_f64());
        eprintln!("{}", selected.as_secs_f64());
        eprintln!("{}", ranked.as_secs_f64());
        return Ok(());
    }

    let mut out = BufWriter::new(io::stdout().lock());
    for value in &values {
        write!(out, "{value} ")?;
    }
    write_line(&mut out, orders)?;
    out.flush().context("failed to write answers")
}

fn create(output: &Path, extension: &str) -> Result<BufWriter<File>> {
    let path = output.with_extension(extension);
    let file =
        File::create(&path).with_context(|| format!("failed to create {}", path.display()))?;
    Ok(BufWriter::new(file))
}

/// Keys are `0, s, 2s, ...` for a spacing `s`, so every answer is computed without a tree.
fn gen_range(
    n_keys: usize,
    key_max: i64,
    n_queries: usize,
    output: &Path,
    mut rng: StdRng,
) -> Result<()> {
    ensure!(n_keys > 0, "at least one key is required");
    ensure!(key_max >= 0, "key maximum must not be negative");

    let count = i64::try_from(n_keys).context("too many keys")?;
    let spacing = (key_max / count).max(1);
    let last = (count - 1) * spacing;
    let deviation = key_max / 4;

    let mut dat = create(output, "dat")?;
    let mut ans = create(output, "ans")?;

    write!(dat, "{n_keys} ")?;
    write_line(&mut dat, (0..count).map(|i| i * spacing))?;

    write!(dat, "{n_queries} ")?;
    let mut answers = Vec::with_capacity(n_queries);
    for _ in 0..n_queries {
        let a = rng.gen_range(-deviation..=key_max + deviation);
        let b = rng.gen_range(-deviation..=key_max + deviation);
        let (lo, hi) = (a.min(b), a.max(b));
        write!(dat, "{lo} {hi} ")?;

        answers.push(if hi < 0 || lo > last {
            0
        } else {
            // First multiple of `spacing` at or above `lo`, last one at or below `hi`.
            let first = lo.clamp(0, last);
            let first = first + (spacing - first % spacing) % spacing;
            let final_ = hi.clamp(0, last);
            let final_ = final_ - final_ % spacing;
            if first > final_ {
                0
            } else {
                (final_ - first) / spacing + 1
            }
        });
    }
    writeln!(dat)?;
    write_line(&mut ans, answers)?;

    dat.flush()?;
    ans.flush()?;
    info!(keys = n_keys, queries = n_queries, "range test written");
    Ok(())
}

fn gen_order(
    n_keys: usize,
    n_nth: usize,
    n_order: usize,
    key_max: i64,
    output: &Path,
    mut rng: StdRng,
) -> Result<()> {
    ensure!(key_max >= 0, "key maximum must not be negative");
    let available = usize::try_from(key_max)
        .ok()
        .and_then(|max| max.checked_add(1));
    if available.is_some_and(|available| n_keys > available) {
        bail!("cannot draw {n_keys} distinct keys from 0..={key_max}");
    }

    let mut dat = create(output, "dat")?;
    let mut ans = create(output, "ans")?;

    let mut drawn = BTreeSet::new();
    let mut keys = Vec::with_capacity(n_keys);
    while keys.len() < n_keys {
        let key = rng.gen_range(0..=key_max);
        if drawn.insert(key) {
            keys.push(key);
        }
    }
    writeln!(dat, "{n_keys}")?;
    write_line(&mut dat, &keys)?;

    let sorted: Vec<i64> = drawn.into_iter().collect();

    writeln!(dat, "{n_nth}")?;
    let mut answers = Vec::with_capacity(n_nth + n_order);
    let mut ranks = Vec::with_capacity(n_nth);
    if n_nth > 0 {
        ensure!(n_keys > 0, "rank queries need at least one key");
        for _ in 0..n_nth {
            let k = rng.gen_range(1..=n_keys);
            ranks.push(k);
            answers.push(sorted[k - 1]);
        }
    }
    write_line(&mut dat, ranks)?;

    writeln!(dat, "{n_order}")?;
    let deviation = key_max / 4;
    let mut probes = Vec::with_capacity(n_order);
    for _ in 0..n_order {
        let key = rng.gen_range(-deviation..=key_max + deviation);
        probes.push(key);
        answers.push(i64::try_from(sorted.partition_point(|&k| k < key))?);
    }
    write_line(&mut dat, probes)?;

    write_line(&mut ans, answers)?;

    dat.flush()?;
    ans.flush()?;
    info!(keys = n_keys, nth = n_nth, order = n_order, "order test written");
    Ok(())
}
