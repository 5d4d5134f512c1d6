//! Harvest coordinator - main orchestration logic
//!
//! This module runs the two independent harvests of a run:
//! - the course listing, as one pagination sequence
//! - the program subject area index, followed by one program listing
//!   sequence per subject area
//!
//! Both share one fetcher (and so one throttle and proxy rotation) and fold
//! their records into one `HarvestStore`. The store is read only after both
//! have finished.

use crate::config::{Config, SiteConfig};
use crate::crawler::driver::{run_sequence, SequenceOutcome};
use crate::crawler::extractor::{ContentType, Extracted};
use crate::crawler::fetcher::Fetcher;
use crate::records::ProgramSubjectArea;
use crate::state::{HarvestSnapshot, HarvestStore};
use crate::storage::{open_storage, LoadSummary, NewRun, Storage};
use crate::url::resolve_link;
use crate::HarvestError;
use chrono::{DateTime, Utc};
use std::collections::HashSet;
use url::Url;

/// A subject area whose program listing could not be harvested
#[derive(Debug, Clone)]
pub struct SubjectAreaFailure {
    pub name: String,
    pub url: String,
    pub error: String,
}

/// What happened during a harvest
#[derive(Debug)]
pub struct HarvestReport {
    pub started_at: DateTime<Utc>,
    pub finished_at: DateTime<Utc>,

    /// The course listing sequence
    pub courses: SequenceOutcome,

    /// The subject area index sequence
    pub subject_index: SequenceOutcome,

    /// Distinct subject areas discovered by the index, in page order
    pub subject_areas: Vec<ProgramSubjectArea>,

    /// Program listing sequences that finished
    pub program_sequences_done: usize,

    /// Subject areas whose program listing aborted
    pub failed_subject_areas: Vec<SubjectAreaFailure>,

    /// Distinct courses held by the store
    pub course_count: usize,

    /// Distinct programs held by the store
    pub program_count: usize,
}

impl HarvestReport {
    /// Returns true if every sequence reached `Done`
    pub fn is_complete(&self) -> bool {
        self.courses.is_success()
            && self.subject_index.is_success()
            && self.failed_subject_areas.is_empty()
    }
}

/// Result of the program side of a harvest
struct ProgramHarvest {
    index: SequenceOutcome,
    subject_areas: Vec<ProgramSubjectArea>,
    done: usize,
    failures: Vec<SubjectAreaFailure>,
}

/// Main harvest coordinator
pub struct Harvester {
    site: SiteConfig,
    fetcher: Fetcher,
    store: HarvestStore,
}

impl Harvester {
    /// Creates a harvester with the fetcher described by the configuration
    ///
    /// # Returns
    ///
    /// * `Ok(Harvester)` - Ready to run
    /// * `Err(HarvestError::FatalInit)` - The proxy configuration is unusable
    pub fn new(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::from_config(config)?;
        Ok(Self::with_fetcher(config.site.clone(), fetcher))
    }

    /// Creates a harvester after checking that the configured proxies answer
    ///
    /// Fails with `HarvestError::FatalInit` when no proxy is reachable.
    pub async fn connect(config: &Config) -> Result<Self, HarvestError> {
        let fetcher = Fetcher::connect(config).await?;
        Ok(Self::with_fetcher(config.site.clone(), fetcher))
    }

    /// Creates a harvester around an existing fetcher
    pub fn with_fetcher(site: SiteConfig, fetcher: Fetcher) -> Self {
        Self {
            site,
            fetcher,
            store: HarvestStore::new(),
        }
    }

    pub fn store(&self) -> &HarvestStore {
        &self.store
    }

    /// Takes the read-only view of everything harvested so far
    pub fn snapshot(&self) -> HarvestSnapshot {
        self.store.snapshot()
    }

    /// Runs the course and program harvests concurrently
    ///
    /// Fetch failures never fail the run; they are recorded in the report.
    pub async fn run(&self) -> Result<HarvestReport, HarvestError> {
        let course_seed = Url::parse(&self.site.course_seed)?;
        let subject_area_seed = Url::parse(&self.site.subject_area_seed)?;
        let started_at = Utc::now();

        tracing::info!("Starting harvest of {}", self.site.allowed_domain);

        let (courses, programs) = tokio::join!(
            self.harvest_courses(course_seed),
            self.harvest_programs(subject_area_seed)
        );

        let report = HarvestReport {
            started_at,
            finished_at: Utc::now(),
            courses,
            subject_index: programs.index,
            subject_areas: programs.subject_areas,
            program_sequences_done: programs.done,
            failed_subject_areas: programs.failures,
            course_count: self.store.courses.len(),
            program_count: self.store.programs.len(),
        };

        tracing::info!(
            "Harvest finished: {} courses, {} programs, {} failed subject areas",
            report.course_count,
            report.program_count,
            report.failed_subject_areas.len()
        );

        Ok(report)
    }

    async fn harvest_courses(&self, seed: Url) -> SequenceOutcome {
        run_sequence(&self.fetcher, seed, ContentType::Courses, |record, _| {
            if let Extracted::Course(course) = record {
                self.store.upsert_course(course);
            }
        })
        .await
    }

    /// Harvests the subject area index, then every subject area's listing
    ///
    /// A failed subject area is recorded and the loop moves on to the next
    /// one. Index links resolving to the same listing are harvested once.
    async fn harvest_programs(&self, seed: Url) -> ProgramHarvest {
        let mut subject_areas = Vec::new();
        let mut targets = Vec::new();
        let mut seen = HashSet::new();

        let index = run_sequence(
            &self.fetcher,
            seed,
            ContentType::SubjectAreaIndex,
            |record, page_url| {
                if let Extracted::SubjectArea(area) = record {
                    match resolve_link(&area.endpoint, page_url) {
                        Some(url) if seen.insert(url.clone()) => {
                            targets.push((area.name.clone(), url));
                            subject_areas.push(area);
                        }
                        Some(url) => tracing::debug!("Duplicate subject area link {}", url),
                        None => {
                            tracing::debug!("Unusable subject area link {}", area.endpoint);
                            subject_areas.push(area);
                        }
                    }
                }
            },
        )
        .await;

        tracing::info!("Discovered {} subject areas", subject_areas.len());

        let mut done = 0;
        let mut failures = Vec::new();

        for (name, url) in targets {
            let outcome = run_sequence(&self.fetcher, url, ContentType::Programs, |record, _| {
                if let Extracted::Program(program) = record {
                    self.store.upsert_program(program);
                }
            })
            .await;

            match outcome.error {
                None => done += 1,
                Some(error) => {
                    tracing::error!("Subject area {} failed: {}", name, error);
                    failures.push(SubjectAreaFailure {
                        name,
                        url: outcome.seed.to_string(),
                        error: error.to_string(),
                    });
                }
            }
        }

        ProgramHarvest {
            index,
            subject_areas,
            done,
            failures,
        }
    }
}

/// Outcome of a full harvest-and-load run
#[derive(Debug)]
pub struct RunSummary {
    pub report: HarvestReport,
    pub load: LoadSummary,
}

/// Runs a complete harvest
///
/// This is the main entry point. It will:
/// 1. Open the database (fatal if unreachable)
/// 2. Build the fetcher (fatal if no proxy is usable)
/// 3. Run the course and program harvests concurrently
/// 4. Load the snapshot in one transaction
///
/// # Example
///
/// ```no_run
/// use calendar_harvest::config::load_config_with_hash;
/// use calendar_harvest::crawler::run_harvest;
/// use std::path::Path;
///
/// # async fn example() -> Result<(), Box<dyn std::error::Error>> {
/// let (config, hash) = load_config_with_hash(Path::new("harvest.toml"))?;
/// let summary = run_harvest(&config, &hash).await?;
/// println!("{} rows loaded", summary.load.rows_affected());
/// # Ok(())
/// # }
/// ```
pub async fn run_harvest(config: &Config, config_hash: &str) -> Result<RunSummary, HarvestError> {
    let mut storage = open_storage(&config.database)?;
    let harvester = Harvester::connect(config).await?;

    let report = harvester.run().await?;
    let snapshot = harvester.snapshot();

    let run = NewRun {
        started_at: report.started_at,
        finished_at: report.finished_at,
        config_hash: config_hash.to_string(),
        failed_subject_areas: report.failed_subject_areas.len(),
    };
    let load = storage.load_harvest(&snapshot, &run)?;

    Ok(RunSummary { report, load })
}
