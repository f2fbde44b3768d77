use std::time::{Duration, Instant};

use chrono::Utc;
use serde::Serialize;
use tracing::{info, warn};

use crate::catalog::CatalogClient;
use crate::domain::{CategoryNode, DatasetFamily, DatasetRecord};
use crate::error::SyncError;
use crate::extent::ExtentResolver;
use crate::its::its_package;
use crate::ogc::OgcClient;
use crate::package::{PackageAssembler, PackageDocument};
use crate::registry::RegistryClient;
use crate::repair;
use crate::store::SnapshotStore;
use crate::taxonomy;

/// Which RRK collection and taxonomy a run reads, and how.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct CatalogQuery {
    pub collection_id: u32,
    pub taxonomy_id: u32,
    pub page_limit: u32,
}

#[derive(Debug, Clone, Copy, Default)]
pub struct SyncOptions {
    /// Assemble and snapshot, but never call CKAN.
    pub dry_run: bool,
    /// Report packages CKAN already has and keep going.
    pub skip_existing: bool,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize)]
#[serde(rename_all = "snake_case")]
pub enum SyncAction {
    Created,
    Planned,
    Existing,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncItem {
    pub family: DatasetFamily,
    pub name: String,
    pub title: String,
    pub action: SyncAction,
    pub ckan_id: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct SyncReport {
    pub started_at: String,
    pub dry_run: bool,
    pub items: Vec<SyncItem>,
    pub snapshot: Option<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct PurgeReport {
    pub dry_run: bool,
    pub deleted: Vec<String>,
    pub failed: Vec<String>,
}

#[derive(Debug, Clone, Serialize)]
pub struct TitleCheck {
    pub name: String,
    pub dataset_ids: Vec<i64>,
    pub unique: bool,
}

#[derive(Debug, Clone)]
pub struct ProgressEvent {
    pub message: String,
    pub elapsed: Option<Duration>,
}

pub trait ProgressSink {
    fn event(&self, event: ProgressEvent);
}

/// Publishes RRK datasets to CKAN.
pub struct App<C: CatalogClient, R: RegistryClient, O: OgcClient> {
    catalog: C,
    registry: R,
    ogc: O,
    assembler: PackageAssembler,
    query: CatalogQuery,
    snapshot: SnapshotStore,
}

impl<C: CatalogClient, R: RegistryClient, O: OgcClient> App<C, R, O> {
    pub fn new(
        catalog: C,
        registry: R,
        ogc: O,
        assembler: PackageAssembler,
        query: CatalogQuery,
        snapshot: SnapshotStore,
    ) -> Self {
        Self {
            catalog,
            registry,
            ogc,
            assembler,
            query,
            snapshot,
        }
    }

    /// Creates one package per CLM dataset, in catalog order, and snapshots
    /// every assembled document.
    pub fn sync_clm(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let mut report = self.start_report(options);
        if !options.dry_run {
            self.ensure_organization()?;
        }
        self.run_clm(options, sink, &mut report)?;
        Ok(report)
    }

    pub fn sync_its(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let mut report = self.start_report(options);
        if !options.dry_run {
            self.ensure_organization()?;
        }
        self.run_its(options, sink, &mut report)?;
        Ok(report)
    }

    /// ITS first, then CLM, checking the organization once.
    pub fn sync_all(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
    ) -> Result<SyncReport, SyncError> {
        let mut report = self.start_report(options);
        if !options.dry_run {
            self.ensure_organization()?;
        }
        self.run_its(options, sink, &mut report)?;
        self.run_clm(options, sink, &mut report)?;
        Ok(report)
    }

    /// Deletes every CKAN package this tool owns. Failed deletions are
    /// reported, not fatal.
    pub fn purge(&self, dry_run: bool, sink: &dyn ProgressSink) -> Result<PurgeReport, SyncError> {
        let ids: Vec<String> = self
            .registry
            .list_package_ids()?
            .into_iter()
            .filter(|id| DatasetFamily::owns(id))
            .collect();

        let mut report = PurgeReport {
            dry_run,
            deleted: Vec::new(),
            failed: Vec::new(),
        };
        for id in ids {
            if dry_run {
                sink.event(ProgressEvent {
                    message: format!("would delete {id}"),
                    elapsed: None,
                });
                report.deleted.push(id);
                continue;
            }
            match self.registry.delete_package(&id) {
                Ok(()) => {
                    sink.event(ProgressEvent {
                        message: format!("deleted {id}"),
                        elapsed: None,
                    });
                    report.deleted.push(id);
                }
                Err(err) => {
                    warn!(package = %id, error = %err, "delete failed");
                    report.failed.push(id);
                }
            }
        }
        Ok(report)
    }

    /// Assembles the package for one dataset without touching CKAN.
    pub fn inspect(&self, dataset_id: i64) -> Result<PackageDocument, SyncError> {
        let (datasets, hierarchy) = self.load_catalog()?;
        let mut dataset = datasets
            .into_iter()
            .find(|dataset| dataset.dataset_id == dataset_id)
            .ok_or(SyncError::DatasetNotFound(dataset_id))?;
        let extents = self.extent_resolver();
        self.assemble(&mut dataset, &hierarchy, &extents)
    }

    pub fn check_title(&self, name: &str) -> Result<TitleCheck, SyncError> {
        let hierarchy = self
            .catalog
            .get_hierarchy(self.query.collection_id, self.query.taxonomy_id)?;
        let dataset_ids = taxonomy::find_by_name(name, &hierarchy);
        Ok(TitleCheck {
            name: name.to_string(),
            unique: dataset_ids.len() == 1,
            dataset_ids,
        })
    }

    fn start_report(&self, options: SyncOptions) -> SyncReport {
        SyncReport {
            started_at: Utc::now().to_rfc3339(),
            dry_run: options.dry_run,
            items: Vec::new(),
            snapshot: None,
        }
    }

    fn ensure_organization(&self) -> Result<(), SyncError> {
        let org = self.assembler.org();
        if self.registry.organization_exists(org)? {
            Ok(())
        } else {
            Err(SyncError::OrganizationNotFound(org.to_string()))
        }
    }

    fn load_catalog(&self) -> Result<(Vec<DatasetRecord>, Vec<CategoryNode>), SyncError> {
        let datasets = self.catalog.list_datasets(
            self.query.collection_id,
            0,
            self.query.page_limit,
            "dataset_id",
            true,
        )?;
        let hierarchy = self
            .catalog
            .get_hierarchy(self.query.collection_id, self.query.taxonomy_id)?;
        info!(datasets = datasets.len(), "loaded RRK catalog");
        Ok((datasets, hierarchy))
    }

    fn extent_resolver(&self) -> ExtentResolver<&O> {
        let endpoints = self.assembler.endpoints();
        ExtentResolver::new(&self.ogc, endpoints.wms.as_str(), endpoints.wcs.as_str())
    }

    fn assemble(
        &self,
        dataset: &mut DatasetRecord,
        hierarchy: &[CategoryNode],
        extents: &ExtentResolver<&O>,
    ) -> Result<PackageDocument, SyncError> {
        repair::apply(dataset);
        let category = taxonomy::find_category(dataset.dataset_id, hierarchy);
        self.assembler.assemble(dataset, category.as_ref(), extents)
    }

    fn run_clm(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let (datasets, hierarchy) = self.load_catalog()?;
        let extents = self.extent_resolver();

        let mut packages = Vec::with_capacity(datasets.len());
        for mut dataset in datasets {
            let started = Instant::now();
            let package = self.assemble(&mut dataset, &hierarchy, &extents)?;
            let item = self.submit(DatasetFamily::Clm, &package, options, sink, started)?;
            packages.push(package);
            report.items.push(item);
        }

        self.snapshot.write(&packages)?;
        report.snapshot = Some(self.snapshot.path().to_string());
        Ok(())
    }

    fn run_its(
        &self,
        options: SyncOptions,
        sink: &dyn ProgressSink,
        report: &mut SyncReport,
    ) -> Result<(), SyncError> {
        let started = Instant::now();
        let package = its_package(self.assembler.org());
        let item = self.submit(DatasetFamily::Its, &package, options, sink, started)?;
        report.items.push(item);
        Ok(())
    }

    fn submit(
        &self,
        family: DatasetFamily,
        package: &PackageDocument,
        options: SyncOptions,
        sink: &dyn ProgressSink,
        started: Instant,
    ) -> Result<SyncItem, SyncError> {
        let item = |action, ckan_id| SyncItem {
            family,
            name: package.name.clone(),
            title: package.title.clone(),
            action,
            ckan_id,
        };

        if options.dry_run {
            sink.event(ProgressEvent {
                message: format!("planned {}", package.title),
                elapsed: Some(started.elapsed()),
            });
            return Ok(item(SyncAction::Planned, None));
        }

        sink.event(ProgressEvent {
            message: format!("creating {}", package.title),
            elapsed: None,
        });
        match self.registry.create_package(package) {
            Ok(id) => {
                sink.event(ProgressEvent {
                    message: format!("created {}", package.name),
                    elapsed: Some(started.elapsed()),
                });
                Ok(item(SyncAction::Created, Some(id)))
            }
            Err(SyncError::DuplicateName(name)) if options.skip_existing => {
                sink.event(ProgressEvent {
                    message: format!("already in CKAN: {name}"),
                    elapsed: Some(started.elapsed()),
                });
                Ok(item(SyncAction::Existing, None))
            }
            Err(err) => Err(err),
        }
    }
}
