//! Stage 2: render every result poster to PNG.
//!
//! Reads the snapshot from stage 1 and, for each published year whose
//! results loaded, derives the programs and renders every poster style for
//! each one. Output goes to the processed directory together with a manifest
//! that stage 3 reads.
//!
//! ## Output Structure
//!
//! ```text
//! processed/
//! ├── manifest.json                       # Snapshot + poster index
//! ├── .cache-manifest.json                # Raster cache
//! └── 2025/
//!     ├── 001-arabic-song--junior/
//!     │   ├── style-1.png                 # One PNG per poster style
//!     │   ├── ...
//!     │   └── style-5.png
//!     └── 002-essay-writing--senior/
//! ```
//!
//! ## Parallel Processing
//!
//! Posters are independent, so every (program, style) pair is one rayon task.
//! The global pool size comes from `[processing] max_processes`. Progress
//! events go through an mpsc channel so the caller can print them from a
//! single thread while workers keep running.

use crate::aggregate::{program_winners, unique_programs};
use crate::cache::{self, CacheManifest, CacheStats};
use crate::config::SiteConfig;
use crate::export::{ExportError, Rasterizer, write_atomic};
use crate::fetch::{FetchError, Snapshot};
use crate::naming::program_dir;
use crate::poster::{PosterStyle, render_svg};
use crate::types::{PosterData, Program};
use rayon::prelude::*;
use serde::{Deserialize, Serialize};
use std::collections::BTreeMap;
use std::path::{Path, PathBuf};
use std::sync::mpsc::Sender;
use thiserror::Error;

#[derive(Error, Debug)]
pub enum ProcessError {
    #[error("IO error: {0}")]
    Io(#[from] std::io::Error),
    #[error("JSON error: {0}")]
    Json(#[from] serde_json::Error),
    #[error("Snapshot error: {0}")]
    Snapshot(#[from] FetchError),
    #[error("Poster export failed for {path}: {source}")]
    Export {
        path: String,
        #[source]
        source: ExportError,
    },
}

/// Processed manifest: the snapshot plus where each program's posters live.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct ProcessedManifest {
    pub snapshot: Snapshot,
    /// Year → programs with rendered posters, in listing order.
    pub posters: BTreeMap<String, Vec<ProgramPosters>>,
}

impl ProcessedManifest {
    pub fn config(&self) -> &SiteConfig {
        &self.snapshot.config
    }

    pub fn posters_for(&self, year: &str) -> &[ProgramPosters] {
        self.posters.get(year).map(Vec::as_slice).unwrap_or(&[])
    }
}

/// Posters of one program.
#[derive(Debug, Clone, PartialEq, Serialize, Deserialize)]
pub struct ProgramPosters {
    pub program: Program,
    /// Directory relative to the processed root, e.g. `2025/001-quiz--junior`.
    pub dir: String,
    /// File names inside `dir`, one per style in style order.
    pub files: Vec<String>,
}

/// How one poster was produced.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum CacheOutcome {
    /// Existing PNG at the same path reused.
    Cached,
    /// Existing PNG copied from another path.
    Copied,
    Rendered,
}

/// Progress events emitted while posters are produced.
#[derive(Debug, Clone)]
pub enum ProcessEvent {
    YearStarted {
        year: String,
        programs: usize,
    },
    /// The year's results failed to load, so it has no posters.
    YearSkipped {
        year: String,
        message: String,
    },
    PosterDone {
        year: String,
        program: Program,
        style: PosterStyle,
        outcome: CacheOutcome,
    },
}

pub struct ProcessResult {
    pub manifest: ProcessedManifest,
    pub cache_stats: CacheStats,
}

/// File name of a style's PNG: `style-1.png` ... `style-5.png`.
pub fn style_file(style: PosterStyle) -> String {
    format!("style-{}.png", style.index() + 1)
}

struct Job {
    year: String,
    program: Program,
    style: PosterStyle,
    rel_path: String,
    svg: String,
}

/// Run stage 2 from a snapshot file.
///
/// `site_dir` anchors the configured font directories.
pub fn process(
    snapshot_path: &Path,
    site_dir: &Path,
    output_dir: &Path,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    let snapshot = Snapshot::load(snapshot_path)?;
    let font_dirs: Vec<PathBuf> = snapshot
        .config
        .posters
        .font_dirs
        .iter()
        .map(|d| site_dir.join(d))
        .collect();
    let rasterizer = Rasterizer::new(&font_dirs);
    process_snapshot(
        snapshot,
        &rasterizer,
        &font_dirs,
        output_dir,
        use_cache,
        progress,
    )
}

/// Render posters for an in-memory snapshot.
pub fn process_snapshot(
    snapshot: Snapshot,
    rasterizer: &Rasterizer,
    font_dirs: &[PathBuf],
    output_dir: &Path,
    use_cache: bool,
    progress: Option<Sender<ProcessEvent>>,
) -> Result<ProcessResult, ProcessError> {
    std::fs::create_dir_all(output_dir)?;
    let poster_config = &snapshot.config.posters;
    let params_hash = cache::hash_raster_params(poster_config.pixel_ratio, font_dirs);
    let mut cache = if use_cache {
        CacheManifest::load(output_dir)
    } else {
        CacheManifest::empty()
    };

    let emit = |event: ProcessEvent| {
        if let Some(tx) = &progress {
            let _ = tx.send(event);
        }
    };

    let mut posters = BTreeMap::new();
    let mut jobs = Vec::new();
    for year in &snapshot.years {
        let Some(rows) = year.results.ready() else {
            emit(ProcessEvent::YearSkipped {
                year: year.year.clone(),
                message: year.results.error().unwrap_or_default().to_string(),
            });
            continue;
        };
        let programs = unique_programs(rows);
        emit(ProcessEvent::YearStarted {
            year: year.year.clone(),
            programs: programs.len(),
        });
        let mut listed = Vec::with_capacity(programs.len());
        for (i, program) in programs.into_iter().enumerate() {
            let dir = format!("{}/{}", year.year, program_dir(i, &program));
            let data = PosterData {
                winners: program_winners(rows, &program),
                program: program.clone(),
            };
            for style in PosterStyle::ALL {
                jobs.push(Job {
                    year: year.year.clone(),
                    program: program.clone(),
                    style,
                    rel_path: format!("{}/{}", dir, style_file(style)),
                    svg: render_svg(style, &data, poster_config),
                });
            }
            listed.push(ProgramPosters {
                program,
                dir,
                files: PosterStyle::ALL.iter().map(|s| style_file(*s)).collect(),
            });
        }
        posters.insert(year.year.clone(), listed);
    }

    let outcomes: Vec<(String, String, CacheOutcome)> = jobs
        .par_iter()
        .map(|job| -> Result<(String, String, CacheOutcome), ProcessError> {
            let svg_hash = cache::hash_svg(&job.svg);
            let outcome = render_job(
                job,
                &svg_hash,
                &params_hash,
                &cache,
                rasterizer,
                poster_config.pixel_ratio,
                output_dir,
            )?;
            if let Some(tx) = &progress {
                let _ = tx.send(ProcessEvent::PosterDone {
                    year: job.year.clone(),
                    program: job.program.clone(),
                    style: job.style,
                    outcome,
                });
            }
            Ok((job.rel_path.clone(), svg_hash, outcome))
        })
        .collect::<Result<_, _>>()?;

    let mut cache_stats = CacheStats::default();
    for (rel_path, svg_hash, outcome) in outcomes {
        match outcome {
            CacheOutcome::Cached => cache_stats.hit(),
            CacheOutcome::Copied => cache_stats.copy(),
            CacheOutcome::Rendered => cache_stats.miss(),
        }
        cache.insert(rel_path, svg_hash, params_hash.clone());
    }
    cache.save(output_dir)?;

    Ok(ProcessResult {
        manifest: ProcessedManifest { snapshot, posters },
        cache_stats,
    })
}

fn render_job(
    job: &Job,
    svg_hash: &str,
    params_hash: &str,
    cache: &CacheManifest,
    rasterizer: &Rasterizer,
    pixel_ratio: u32,
    output_dir: &Path,
) -> Result<CacheOutcome, ProcessError> {
    let target = output_dir.join(&job.rel_path);
    if let Some(stored) = cache.find_cached(svg_hash, params_hash, output_dir) {
        if stored == job.rel_path {
            return Ok(CacheOutcome::Cached);
        }
        if let Some(parent) = target.parent() {
            std::fs::create_dir_all(parent)?;
        }
        std::fs::copy(output_dir.join(&stored), &target)?;
        tracing::debug!(from = %stored, to = %job.rel_path, "poster copied from cache");
        return Ok(CacheOutcome::Copied);
    }
    let export_err = |source| ProcessError::Export {
        path: job.rel_path.clone(),
        source,
    };
    let png = rasterizer
        .rasterize(&job.svg, pixel_ratio)
        .map_err(export_err)?;
    write_atomic(&target, &png).map_err(export_err)?;
    Ok(CacheOutcome::Rendered)
}
