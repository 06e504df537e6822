use anyhow::{bail, Context, Result};
use catrec::persist::{
    load_centroids, load_corpus, load_index, save_centroids, save_corpus, save_index, save_meta,
    save_sweep, ArtifactPaths, MetaFile, FORMAT_VERSION,
};
use catrec::tokenizer::frequency_distribution;
use catrec::{
    build_centroids, evaluate, recommend, sample, score_against_ground_truth, sweep,
    CategoryStore, DocId, IndexSnapshot, MemoryStore, SweepConfig, Target,
};
use clap::{Parser, Subcommand};
use serde::Deserialize;
use std::collections::{BTreeMap, BTreeSet, HashMap};
use std::fs::{self, File};
use std::io::{BufRead, BufReader};
use std::path::{Path, PathBuf};
use tracing_subscriber::{fmt, EnvFilter};
use walkdir::WalkDir;

#[derive(Debug, Deserialize)]
struct InputPage {
    title: String,
    text: String,
    #[serde(default)]
    categories: Vec<String>,
}

#[derive(Debug, Deserialize)]
struct InputEdge {
    parent: String,
    child: String,
}

#[derive(Parser)]
#[command(name = "evaluator")]
#[command(about = "Build and evaluate the category recommendation engine", long_about = None)]
struct Cli {
    /// Artifact directory for index/corpus/centroid/sweep snapshots
    #[arg(long, default_value = "artifacts")]
    artifacts: PathBuf,

    /// Snapshot name the artifacts are keyed by
    #[arg(long, default_value = "wiki")]
    name: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Subcommand)]
enum Commands {
    /// Ingest pages and hierarchy edges, build and persist the index
    Build {
        /// Page input: JSON/JSONL file or a directory of them
        #[arg(long)]
        input: PathBuf,
        /// Hierarchy edge input: JSON/JSONL file
        #[arg(long)]
        edges: Option<PathBuf>,
    },
    /// Build and persist the centroid set
    Centroids {
        /// Minimum member pages for a category to get a centroid
        #[arg(long, default_value_t = 5)]
        min_pages: u32,
    },
    /// Recommend categories for a corpus page or an ad hoc text file
    Recommend {
        /// Title of an in-corpus page
        #[arg(long, conflicts_with = "text_file")]
        page: Option<String>,
        /// Path to a plain-text document
        #[arg(long)]
        text_file: Option<PathBuf>,
        /// Number of suggestions (default: matched to the ground truth size)
        #[arg(long)]
        top: Option<usize>,
    },
    /// Score recommendations for a random sample of corpus pages
    Evaluate {
        #[arg(long, default_value_t = 100)]
        sample: usize,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
    /// Sweep the min-pages threshold and record the sensitivity curve
    Sweep {
        #[arg(long, default_value_t = 4)]
        min_pages: u32,
        #[arg(long, default_value_t = 50)]
        max_pages: u32,
        #[arg(long, default_value_t = 100)]
        sample_size: usize,
        /// Fraction of the corpus held out of centroid construction
        #[arg(long, default_value_t = 0.2)]
        held_out: f64,
        #[arg(long, default_value_t = 0)]
        seed: u64,
    },
}

fn main() -> Result<()> {
    fmt().with_env_filter(EnvFilter::from_default_env()).init();
    let cli = Cli::parse();
    let paths = ArtifactPaths::new(&cli.artifacts);

    match cli.command {
        Commands::Build { input, edges } => build(&paths, &cli.name, &input, edges.as_deref()),
        Commands::Centroids { min_pages } => centroids(&paths, &cli.name, min_pages),
        Commands::Recommend { page, text_file, top } => {
            recommend_cmd(&paths, &cli.name, page, text_file, top)
        }
        Commands::Evaluate { sample, seed } => evaluate_cmd(&paths, &cli.name, sample, seed),
        Commands::Sweep { min_pages, max_pages, sample_size, held_out, seed } => sweep_cmd(
            &paths,
            &cli.name,
            SweepConfig {
                min_pages,
                max_pages,
                sample_size,
                held_out_fraction: held_out,
                seed,
            },
        ),
    }
}

fn build(paths: &ArtifactPaths, name: &str, input: &Path, edges: Option<&Path>) -> Result<()> {
    let mut store = MemoryStore::new();
    let mut tables: BTreeMap<DocId, HashMap<String, u32>> = BTreeMap::new();

    for file in collect_input_files(input)? {
        let pages: Vec<InputPage> = read_records(&file)
            .with_context(|| format!("reading pages from {}", file.display()))?;
        for page in pages {
            let id = store.add_page(&page.title, page.categories);
            tables.insert(id, frequency_distribution(&page.text));
        }
    }
    tracing::info!(pages = store.num_pages(), "ingested corpus");

    if let Some(edge_path) = edges {
        let edge_records: Vec<InputEdge> = read_records(edge_path)
            .with_context(|| format!("reading edges from {}", edge_path.display()))?;
        let count = edge_records.len();
        for e in edge_records {
            store.add_edge(e.parent, e.child);
        }
        tracing::info!(edges = count, "ingested hierarchy");
    }

    let index = IndexSnapshot::build(&tables)?;
    save_index(paths, name, &index)?;
    save_corpus(paths, name, &store)?;
    let meta = MetaFile {
        num_docs: index.num_docs(),
        created_at: time::OffsetDateTime::now_utc()
            .format(&time::format_description::well_known::Rfc3339)
            .unwrap_or_else(|_| "".into()),
        version: FORMAT_VERSION,
    };
    save_meta(paths, &meta)?;
    tracing::info!(name, root = %paths.root.display(), "index build complete");
    Ok(())
}

fn centroids(paths: &ArtifactPaths, name: &str, min_pages: u32) -> Result<()> {
    let index = load_index(paths, name)?;
    let store = load_corpus(paths, name)?;
    let set = build_centroids(&index, &store, min_pages, &BTreeSet::new());
    save_centroids(paths, name, &set)?;
    tracing::info!(name, categories = set.len(), min_pages, "centroid build complete");
    Ok(())
}

fn recommend_cmd(
    paths: &ArtifactPaths,
    name: &str,
    page: Option<String>,
    text_file: Option<PathBuf>,
    top: Option<usize>,
) -> Result<()> {
    let index = load_index(paths, name)?;
    let store = load_corpus(paths, name)?;
    let set = load_centroids(paths, name)?;
    let hierarchy = store.hierarchy();

    let (target, actual) = match (&page, &text_file) {
        (Some(title), None) => {
            let doc = store
                .doc_id(title)
                .with_context(|| format!("page `{title}` is not in the corpus"))?;
            (Target::Doc(doc), store.categories_for_page(doc))
        }
        (None, Some(path)) => {
            let text = fs::read_to_string(path)?;
            let ranking = recommend(&index, &set, Target::Text(&text), top.or(Some(10)))?;
            print_ranking(&ranking);
            return Ok(());
        }
        _ => bail!("exactly one of --page or --text-file is required"),
    };

    let full = recommend(&index, &set, target, None)?;
    let n = top.unwrap_or_else(|| {
        if actual.is_empty() {
            full.len().min(10)
        } else {
            full.len().min(actual.len())
        }
    });
    let suggestions: Vec<(String, f64)> = full.into_iter().take(n).collect();
    print_ranking(&suggestions);

    if !actual.is_empty() {
        let m = score_against_ground_truth(&actual, &suggestions, n, &hierarchy)?;
        println!();
        println!(
            "actual categories: {}",
            actual.iter().cloned().collect::<Vec<_>>().join(", ")
        );
        println!("boolean measure      = {}", m.boolean);
        println!("fractional measure   = {:.2}", m.fractional);
        println!("hierarchical measure = {:.2}", m.hierarchical);
    }
    Ok(())
}

fn print_ranking(ranking: &[(String, f64)]) {
    for (i, (category, score)) in ranking.iter().enumerate() {
        println!("{:3}. {category}  ({score:.4})", i + 1);
    }
}

fn evaluate_cmd(paths: &ArtifactPaths, name: &str, sample_size: usize, seed: u64) -> Result<()> {
    let index = load_index(paths, name)?;
    let store = load_corpus(paths, name)?;
    let set = load_centroids(paths, name)?;
    let hierarchy = store.hierarchy();

    let all = store.all_page_ids();
    let mut rng = sample::SplitMix64::new(seed);
    let docs = sample::sample(&all, sample_size, &mut rng);
    let summary = evaluate(&docs, &index, &set, &store, &hierarchy)?;

    println!("evaluated {} pages ({} skipped)", summary.evaluated, summary.skipped);
    println!(
        "boolean      mean {:.3}  std {:.3}",
        summary.boolean.mean, summary.boolean.std
    );
    println!(
        "fractional   mean {:.3}  std {:.3}",
        summary.fractional.mean, summary.fractional.std
    );
    println!(
        "hierarchical mean {:.3}  std {:.3}",
        summary.hierarchical.mean, summary.hierarchical.std
    );
    Ok(())
}

fn sweep_cmd(paths: &ArtifactPaths, name: &str, cfg: SweepConfig) -> Result<()> {
    let index = load_index(paths, name)?;
    let store = load_corpus(paths, name)?;
    let hierarchy = store.hierarchy();

    let points = sweep(&index, &store, &hierarchy, &cfg)?;
    save_sweep(paths, name, &points)?;

    println!("min_pages  centroids  elapsed_s  bool_mean  frac_mean  hier_mean");
    for p in &points {
        println!(
            "{:9}  {:9}  {:9.2}  {:9.3}  {:9.3}  {:9.3}",
            p.min_pages,
            p.centroid_count,
            p.elapsed_secs,
            p.summary.boolean.mean,
            p.summary.fractional.mean,
            p.summary.hierarchical.mean,
        );
    }
    Ok(())
}

/// A single json/jsonl file, or every json/jsonl file under a directory.
fn collect_input_files(input: &Path) -> Result<Vec<PathBuf>> {
    let mut files = Vec::new();
    if input.is_dir() {
        for entry in WalkDir::new(input).into_iter().filter_map(|e| e.ok()) {
            let p = entry.path();
            if p.is_file() {
                if let Some(ext) = p.extension().and_then(|s| s.to_str()) {
                    if matches!(ext, "json" | "jsonl") {
                        files.push(p.to_path_buf());
                    }
                }
            }
        }
        files.sort();
    } else if input.is_file() {
        files.push(input.to_path_buf());
    } else {
        bail!("input path {} does not exist", input.display());
    }
    Ok(files)
}

/// Parse a JSONL stream or a JSON array/object of records.
fn read_records<T: for<'de> Deserialize<'de>>(file: &Path) -> Result<Vec<T>> {
    let mut out = Vec::new();
    if file.extension().and_then(|s| s.to_str()) == Some("jsonl") {
        let reader = BufReader::new(File::open(file)?);
        for line in reader.lines() {
            let line = line?;
            if line.trim().is_empty() {
                continue;
            }
            out.push(serde_json::from_str(&line)?);
        }
    } else {
        let reader = BufReader::new(File::open(file)?);
        let json: serde_json::Value = serde_json::from_reader(reader)?;
        match json {
            serde_json::Value::Array(arr) => {
                for v in arr {
                    out.push(serde_json::from_value(v)?);
                }
            }
            other => out.push(serde_json::from_value(other)?),
        }
    }
    Ok(out)
}
