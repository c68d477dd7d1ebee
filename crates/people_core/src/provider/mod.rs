//! Person provider facade.
//!
//! # Responsibility
//! - Route externally addressed requests to `PersonStore` operations.
//! - Publish a change signal on the table scope after every mutation that
//!   touched at least one row.
//!
//! # Invariants
//! - Every call completes (or fails) before returning.
//! - Unroutable requests are never errors: queries return no rows, mutations
//!   affect nothing.
//! - Delete is strictly by id.

pub mod request;
pub mod route;
pub mod selector;

use crate::model::person::{Person, PersonId};
use crate::notify::{ChangeNotifier, ChangeSubscription, ObserverId, ResourceScope};
use crate::store::PersonStore;
use log::{debug, info, warn};
use request::{ProviderRequest, ProviderResponse, ProviderResult, RecordValues};
use route::{Route, RouteMatcher};
use selector::{DeleteSelector, AGE_KEY, NAME_KEY};
use std::sync::Arc;

/// Default authority accepted in `content://` paths.
pub const DEFAULT_AUTHORITY: &str = "people.provider";

/// Request router over one store and one notifier.
pub struct PersonProvider {
    store: Arc<PersonStore>,
    notifier: ChangeNotifier,
    matcher: RouteMatcher,
}

impl PersonProvider {
    pub fn new(
        store: Arc<PersonStore>,
        notifier: ChangeNotifier,
        authority: impl Into<String>,
    ) -> Self {
        Self {
            store,
            notifier,
            matcher: RouteMatcher::new(authority),
        }
    }

    pub fn store(&self) -> &Arc<PersonStore> {
        &self.store
    }

    pub fn notifier(&self) -> &ChangeNotifier {
        &self.notifier
    }

    pub fn authority(&self) -> &str {
        self.matcher.authority()
    }

    /// Scope every mutation publishes on.
    pub fn table_scope() -> ResourceScope {
        ResourceScope::parse(route::TABLE_NAME)
    }

    /// Dispatches one request.
    pub fn handle(&self, request: ProviderRequest) -> ProviderResult<ProviderResponse> {
        let operation = request.operation();
        let result = match request {
            ProviderRequest::Query { path } => {
                self.query(&path).map(|rows| ProviderResponse::Rows { rows })
            }
            ProviderRequest::Insert { path, values } => {
                self.insert(&path, values)
                    .map(|id| ProviderResponse::Inserted {
                        id,
                        path: id.map(|id| format!("{}/{id}", route::table_path())),
                    })
            }
            ProviderRequest::Update { path, values } => self
                .update(&path, values)
                .map(|count| ProviderResponse::Affected { count }),
            ProviderRequest::Delete { path, selector } => self
                .delete(&path, &selector)
                .map(|count| ProviderResponse::Affected { count }),
        };

        if let Err(err) = &result {
            warn!(
                "event=provider_request module=provider status=error op={} error_code={} error={}",
                operation,
                err.kind(),
                err
            );
        }
        result
    }

    /// Lists the table, or the people with one name.
    pub fn query(&self, path: &str) -> ProviderResult<Vec<Person>> {
        match self.route(path, "query") {
            Some(Route::Table) => Ok(self.store.select_all()?),
            Some(Route::ByName(name)) => Ok(self.store.select_by_name(&name)?),
            None => Ok(Vec::new()),
        }
    }

    /// Inserts from `values`; `name` and `age` are required, `id` forbidden.
    ///
    /// Returns `None` when the path is unroutable or the row was skipped.
    pub fn insert(&self, path: &str, values: RecordValues) -> ProviderResult<Option<PersonId>> {
        let Some(Route::Table) = self.route(path, "insert") else {
            return Ok(None);
        };

        let person = values.into_new_person()?;
        let id = self.store.insert(&person)?;
        if let Some(id) = id {
            info!("event=provider_insert module=provider status=ok id={id}");
            self.publish_table_change();
        }
        Ok(id)
    }

    /// Replaces the fields present in `values` on the row `values.id`.
    ///
    /// # Errors
    /// - `InvalidValues` when `id` is missing.
    /// - `NotFound` when no row has that id.
    pub fn update(&self, path: &str, values: RecordValues) -> ProviderResult<usize> {
        let Some(Route::Table) = self.route(path, "update") else {
            return Ok(0);
        };

        let (id, patch) = values.into_patch()?;
        let count = self.store.update_by_id(id, &patch)?;
        if count > 0 {
            info!("event=provider_update module=provider status=ok id={id}");
            self.publish_table_change();
        }
        Ok(count)
    }

    /// Deletes the row named by the selector's mandatory `id`.
    ///
    /// # Errors
    /// - `MalformedSelector` when `id` is missing or not an integer.
    pub fn delete(&self, path: &str, selector: &DeleteSelector) -> ProviderResult<usize> {
        let Some(Route::Table) = self.route(path, "delete") else {
            return Ok(0);
        };

        let id = selector.id()?;
        if selector.get(NAME_KEY).is_some() || selector.get(AGE_KEY).is_some() {
            debug!("event=provider_delete module=provider status=ignored_fields id={id}");
        }

        let count = self.store.delete_by_id(id)?;
        if count > 0 {
            info!("event=provider_delete module=provider status=ok id={id}");
            self.publish_table_change();
        }
        Ok(count)
    }

    /// MIME-like type of the resource at `path`.
    pub fn content_type(&self, path: &str) -> Option<&'static str> {
        self.matcher.content_type(path)
    }

    /// Registers an observer on `scope`.
    pub fn subscribe(&self, scope: &ResourceScope, descendants: bool) -> ChangeSubscription {
        self.notifier.subscribe(scope, descendants)
    }

    pub fn unsubscribe(&self, id: ObserverId) -> bool {
        self.notifier.unsubscribe(id)
    }

    fn route(&self, path: &str, operation: &'static str) -> Option<Route> {
        let route = self.matcher.resolve(path);
        match &route {
            None => warn!("event=provider_route module=provider status=no_match op={operation}"),
            Some(Route::ByName(_)) if operation != "query" => {
                warn!("event=provider_route module=provider status=no_match op={operation}");
                return None;
            }
            Some(_) => {}
        }
        route
    }

    fn publish_table_change(&self) {
        self.notifier.publish(&Self::table_scope());
    }
}
