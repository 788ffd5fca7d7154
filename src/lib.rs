//! Parallel directory scanning, bottom-up size aggregation, and
//! multi-pattern classification for disk usage analysis.
//!
//! The pipeline is three stages, each usable on its own:
//!
//! 1. [`walk::scan`] walks a directory tree with a fixed-size thread pool
//!    (see [`walk::queue`] for the work-distribution primitive) and
//!    produces a [`model::ScanSnapshot`].
//! 2. [`tree::finalize`] aggregates file sizes up through the directory
//!    tree and sorts each directory's children by disk usage.
//! 3. [`classify::compile_ruleset`] turns a list of glob-based
//!    [`model::PatternRule`]s into a [`classify::CompiledRuleSet`], and
//!    [`insights::generate`] walks a finalized tree against it to produce
//!    a bounded, ranked [`model::InsightBundle`].
//!
//! ```no_run
//! use std::path::Path;
//! use diskscan::{classify, insights, tree, walk};
//!
//! # fn main() -> Result<(), Box<dyn std::error::Error>> {
//! let config = walk::WalkConfig::default();
//! let walk::WalkOutcome::Completed(mut snapshot) = walk::scan(Path::new("."), &config)? else {
//!     return Ok(());
//! };
//! tree::finalize(&mut snapshot.root);
//!
//! let ruleset = classify::compile_ruleset(&classify::rules::default_rules(), &Default::default())?;
//! let bundle = insights::generate(&snapshot.root, &ruleset, &insights::InsightLimits::default());
//! for insight in bundle.insights.iter().take(10) {
//!     println!("{:?} {} {}", insight.category, insight.disk_usage, insight.path.display());
//! }
//! # Ok(())
//! # }
//! ```

#[cfg(any(target_os = "linux", target_os = "macos", target_os = "android"))]
#[cfg(feature = "mimalloc")]
#[global_allocator]
static ALLOC: mimalloc::MiMalloc = mimalloc::MiMalloc;

pub mod classify;
pub mod error;
pub mod insights;
pub mod model;
pub mod platform;
pub mod tree;
pub mod walk;

pub use error::{ClassifyError, CompileError, ScanError};
pub use model::{
    ApplyTo, Category, CategoryStats, Insight, InsightBundle, NodeKind, PatternRule, ScanNode, ScanSnapshot,
    ScanStats,
};
