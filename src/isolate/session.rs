//! Planner state owned by one isolate
//!
//! An isolate holds its own rule program and, when enabled, a cache of the
//! catalogs it has loaded. It is only ever used by one plan at a time.

use std::collections::HashMap;
use std::path::{Path, PathBuf};
use std::sync::Arc;

use crate::catalog::Catalog;
use crate::config::PlannerConfig;
use crate::encoder::encode;
use crate::observability::{
    log_event_with_fields, Event, Logger, ObservationScope, PlannerMetrics, Severity,
};
use crate::optimizer::{default_program, HepPlanner};
use crate::planner::{explain, QueryPlanner};

use super::errors::{IsolateError, IsolateResult};
use super::request::{PlanRequest, PlanResponse};

/// One isolated planner context
pub struct IsolateSession {
    id: u64,
    case_sensitive: bool,
    cache_catalogs: bool,
    optimizer: HepPlanner,
    catalogs: HashMap<PathBuf, Arc<Catalog>>,
    plans_served: u64,
    released: bool,
}

impl IsolateSession {
    pub fn new(id: u64, config: &PlannerConfig) -> Self {
        Self {
            id,
            case_sensitive: config.case_sensitive,
            cache_catalogs: config.cache_catalogs,
            optimizer: HepPlanner::new(default_program(), config.max_rule_iterations),
            catalogs: HashMap::new(),
            plans_served: 0,
            released: false,
        }
    }

    pub fn is_released(&self) -> bool {
        self.released
    }

    /// Number of successful plans
    pub fn plans_served(&self) -> u64 {
        self.plans_served
    }

    /// Marks the isolate dead and drops its cached state
    pub(crate) fn mark_released(&mut self) {
        self.released = true;
        self.catalogs.clear();
    }

    /// Services one plan request.
    ///
    /// A failed request leaves the isolate usable.
    pub fn plan(
        &mut self,
        request: &PlanRequest,
        metrics: &PlannerMetrics,
    ) -> IsolateResult<PlanResponse> {
        if self.released {
            return Err(IsolateError::Stale(self.id));
        }

        let id = self.id.to_string();
        let database = request.database.display().to_string();
        log_event_with_fields(
            Event::PlanReceived,
            &[("isolate", &id), ("database", &database)],
        );

        let scope = ObservationScope::with_fields("PLAN", &[("isolate", &id)]);

        match self.plan_inner(request, metrics) {
            Ok(response) => {
                self.plans_served += 1;
                metrics.increment_plans_succeeded();
                let operators = response.operator_count().to_string();
                scope.complete_with_fields(&[("operators", &operators)]);
                Ok(response)
            }
            Err(err) => {
                metrics.increment_plans_failed();
                let message = err.message();
                scope.fail(err.code(), &message);
                log_event_with_fields(
                    Event::PlanRejected,
                    &[("isolate", &id), ("code", err.code())],
                );
                Err(err)
            }
        }
    }

    fn plan_inner(
        &mut self,
        request: &PlanRequest,
        metrics: &PlannerMetrics,
    ) -> IsolateResult<PlanResponse> {
        request.validate()?;

        let catalog = self.catalog(&request.database, metrics)?;
        let sql = request.read_query()?;

        let planner = QueryPlanner::new(&catalog, &self.optimizer);
        let optimised = planner.plan(&sql)?;

        let explain = explain(&optimised);
        if Logger::enabled(Severity::Trace) {
            let id = self.id.to_string();
            Logger::trace(
                Event::PlanOptimised.as_str(),
                &[("isolate", &id), ("plan", &explain)],
            );
        }

        let plan = encode(&optimised)?;
        let lines = plan.lines().count().to_string();
        log_event_with_fields(Event::PlanEncoded, &[("lines", &lines)]);

        Ok(PlanResponse {
            plan,
            explain,
            tables: optimised.tables(),
        })
    }

    /// Loads the catalog for `database`, from the cache when enabled
    fn catalog(&mut self, database: &Path, metrics: &PlannerMetrics) -> IsolateResult<Arc<Catalog>> {
        let path = database.display().to_string();

        if let Some(cached) = self.catalogs.get(database) {
            metrics.increment_catalog_cache_hits();
            log_event_with_fields(Event::CatalogCacheHit, &[("database", &path)]);
            return Ok(cached.clone());
        }

        let catalog = Arc::new(Catalog::from_directory(database, self.case_sensitive)?);
        let tables = catalog.tables().len().to_string();
        log_event_with_fields(
            Event::CatalogLoaded,
            &[("database", &path), ("tables", &tables)],
        );

        if self.cache_catalogs {
            self.catalogs.insert(catalog.root().to_path_buf(), catalog.clone());
        }

        Ok(catalog)
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::catalog::fixtures::write_sales_database;
    use std::fs;
    use tempfile::TempDir;

    fn sales_dir() -> TempDir {
        let dir = TempDir::new().unwrap();
        write_sales_database(dir.path());
        dir
    }

    #[test]
    fn test_plan_from_text() {
        let dir = sales_dir();
        let metrics = PlannerMetrics::new();
        let mut session = IsolateSession::new(1, &PlannerConfig::default());

        let request = PlanRequest::from_text(dir.path(), "SELECT c_name FROM customer");
        let response = session.plan(&request, &metrics).unwrap();

        assert_eq!(response.plan, "S;customer;true;1\n");
        assert_eq!(
            response.explain,
            "LogicalArrowTableScan(table=[[customer]], projects=[[1]])\n"
        );
        assert_eq!(response.tables, vec!["customer".to_string()]);
        assert_eq!(session.plans_served(), 1);
        assert_eq!(metrics.snapshot().plans_succeeded, 1);
    }

    #[test]
    fn test_plan_from_query_file() {
        let dir = sales_dir();
        let query = dir.path().join("q.sql");
        fs::write(&query, "SELECT o_id FROM orders WHERE o_custkey = 4").unwrap();

        let metrics = PlannerMetrics::new();
        let mut session = IsolateSession::new(1, &PlannerConfig::default());
        let response = session
            .plan(&PlanRequest::from_paths(dir.path(), &query), &metrics)
            .unwrap();

        assert_eq!(
            response.plan,
            "S;orders;true;0,1\nF;0;=($1, 4)\nP;1;[$0]\n"
        );
    }

    #[test]
    fn test_failed_plan_leaves_session_usable() {
        let dir = sales_dir();
        let metrics = PlannerMetrics::new();
        let mut session = IsolateSession::new(1, &PlannerConfig::default());

        let err = session
            .plan(&PlanRequest::from_text(dir.path(), "SELECT x FROM nowhere"), &metrics)
            .unwrap_err();
        assert_eq!(err.code(), "AETHRA_QUERY_UNKNOWN_TABLE");

        let ok = session.plan(
            &PlanRequest::from_text(dir.path(), "SELECT * FROM orders"),
            &metrics,
        );
        assert!(ok.is_ok());

        let snapshot = metrics.snapshot();
        assert_eq!(snapshot.plans_failed, 1);
        assert_eq!(snapshot.plans_succeeded, 1);
    }

    #[test]
    fn test_catalog_cache_opt_in() {
        let dir = sales_dir();
        let metrics = PlannerMetrics::new();
        let config = PlannerConfig {
            cache_catalogs: true,
            ..PlannerConfig::default()
        };
        let mut session = IsolateSession::new(1, &config);
        let request = PlanRequest::from_text(dir.path(), "SELECT * FROM customer");

        session.plan(&request, &metrics).unwrap();
        session.plan(&request, &metrics).unwrap();
        assert_eq!(metrics.snapshot().catalog_cache_hits, 1);

        let uncached_metrics = PlannerMetrics::new();
        let mut uncached = IsolateSession::new(2, &PlannerConfig::default());
        uncached.plan(&request, &uncached_metrics).unwrap();
        uncached.plan(&request, &uncached_metrics).unwrap();
        assert_eq!(uncached_metrics.snapshot().catalog_cache_hits, 0);
    }

    #[test]
    fn test_released_session_is_stale() {
        let dir = sales_dir();
        let metrics = PlannerMetrics::new();
        let mut session = IsolateSession::new(5, &PlannerConfig::default());
        session.mark_released();

        let err = session
            .plan(&PlanRequest::from_text(dir.path(), "SELECT * FROM orders"), &metrics)
            .unwrap_err();
        assert!(matches!(err, IsolateError::Stale(5)));
    }

    #[test]
    fn test_missing_database() {
        let dir = TempDir::new().unwrap();
        let metrics = PlannerMetrics::new();
        let mut session = IsolateSession::new(1, &PlannerConfig::default());
        let err = session
            .plan(
                &PlanRequest::from_text(dir.path().join("absent"), "SELECT 1"),
                &metrics,
            )
            .unwrap_err();
        assert_eq!(err.code(), "AETHRA_CATALOG_NOT_FOUND");
    }
}
