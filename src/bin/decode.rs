use anyhow::{Context, Result};
use clap::Parser;
use ndarray::Axis;
use std::path::PathBuf;
use tracing_subscriber::EnvFilter;

use ieegconn::decoding::Kernel;
use ieegconn::io::{Dataset, StWriter};
use ieegconn::{ClassifierKind, ClassifierSpec, Classify, CvKind, CvSpec, DecodingConfig, FeatureMode, StatMethod};

#[derive(Parser)]
#[command(name = "decode", about = "Cross-validated decoding accuracy and its significance")]
struct Args {
    /// Dataset safetensors: `x` [N, M], `y` [N]
    #[arg(long)]
    input: PathBuf,

    /// Optional safetensors output (`da`, `pvalue`, `da_perm`)
    #[arg(long)]
    output: Option<PathBuf>,

    /// Classifier name or code: lda svm linearsvm nusvm nb knn rf lr qda
    #[arg(long, default_value = "lda")]
    clf: String,

    /// SVM kernel: linear | rbf | poly | sigmoid
    #[arg(long, default_value = "rbf")]
    kernel: String,

    /// Neighbours of the knn classifier
    #[arg(long, default_value_t = 10)]
    n_knn: usize,

    /// Trees of the rf classifier
    #[arg(long, default_value_t = 100)]
    n_tree: usize,

    /// Cross-validation: skfold | kfold | sss | ss
    #[arg(long, default_value = "skfold")]
    cv: String,

    #[arg(long, default_value_t = 10)]
    n_folds: usize,

    /// Cross-validation repetitions
    #[arg(long, default_value_t = 10)]
    rep: usize,

    /// sf: one dataset per column; mf: all columns together
    #[arg(long, default_value = "sf")]
    xcol: String,

    /// bino | label_rnd | full_rnd | intra_rnd
    #[arg(long, default_value = "bino")]
    method: String,

    #[arg(long, default_value_t = 200)]
    n_perm: usize,

    /// Worker threads, -1 for every core
    #[arg(long, default_value_t = -1, allow_hyphen_values = true)]
    n_jobs: i32,

    #[arg(long, default_value_t = 0)]
    seed: u64,
}

impl Args {
    fn config(&self) -> Result<DecodingConfig> {
        let clf = ClassifierSpec {
            kernel: self.kernel.parse::<Kernel>()?,
            n_knn: self.n_knn,
            n_tree: self.n_tree,
            ..ClassifierSpec::new(self.clf.parse::<ClassifierKind>()?)
        };
        let cv = CvSpec {
            n_folds: self.n_folds,
            rep: self.rep,
            ..CvSpec::new(self.cv.parse::<CvKind>()?)
        };
        Ok(DecodingConfig {
            clf,
            cv,
            feature_mode: self.xcol.parse::<FeatureMode>()?,
            method: self.method.parse::<StatMethod>()?,
            n_perm: self.n_perm,
            n_jobs: self.n_jobs,
            seed: self.seed,
        })
    }
}

fn main() -> Result<()> {
    tracing_subscriber::fmt()
        .with_env_filter(EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("info")))
        .init();
    let args = Args::parse();
    let cfg = args.config()?;

    let ds = Dataset::load(&args.input)?;
    println!("Loaded {} trials × {} features", ds.x.nrows(), ds.x.ncols());

    let clf = Classify::new(&ds.y, cfg.clf.clone(), cfg.cv.clone())?;
    println!("{clf}");

    let da = clf
        .fit(&ds.x, cfg.feature_mode, cfg.n_jobs)
        .context("decoding failed")?;
    let stat = clf
        .stat(&ds.x, &da, cfg.method, cfg.n_perm, cfg.n_jobs, cfg.seed)
        .context("statistics failed")?;

    let mean = da.mean_axis(Axis(1)).context("no repetition")?;
    for (k, m) in mean.iter().enumerate() {
        // Binomial p-values follow da; permutation p-values have one column.
        let p = stat.pvalue.row(k);
        let p_min = p.iter().copied().fold(f64::INFINITY, f64::min);
        println!("dataset {k:>3}: da = {m:6.2} %  p = {p_min:.4}");
    }

    if let Some(out) = &args.output {
        let mut w = StWriter::new();
        w.add_f64_arr2("da", &da);
        w.add_f64_arr2("pvalue", &stat.pvalue);
        if let Some(null) = &stat.da_perm {
            w.add_f64_arr2("da_perm", null);
        }
        w.write(out)?;
        println!("Written → {}", out.display());
    }

    Ok(())
}
