use futures::future::LocalBoxFuture;
use parking_lot::RwLock;
use std::{collections::BTreeMap, fmt::Display, future::Future, sync::Arc};

/// A health check
pub trait Check: Send + Sync + 'static {
    type Error: Display;

    async fn run(&self) -> Result<(), Self::Error>;
}

trait DynCheck: Send + Sync {
    fn run_dyn(&self) -> LocalBoxFuture<'_, Result<(), String>>;
}

impl<C: Check> DynCheck for C {
    fn run_dyn(&self) -> LocalBoxFuture<'_, Result<(), String>> {
        Box::pin(async move { self.run().await.map_err(|err| err.to_string()) })
    }
}

/// A check backed by an async function
pub struct FnCheck<F>(pub F);

impl<F, Fut, E> Check for FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    type Error = E;

    async fn run(&self) -> Result<(), Self::Error> {
        (self.0)().await
    }
}

pub fn check_fn<F, Fut, E>(f: F) -> FnCheck<F>
where
    F: Fn() -> Fut + Send + Sync + 'static,
    Fut: Future<Output = Result<(), E>>,
    E: Display,
{
    FnCheck(f)
}

#[derive(Clone, Debug, PartialEq, Eq, serde::Serialize)]
#[serde(rename_all = "camelCase")]
pub struct CheckResult {
    pub up: bool,
    #[serde(default, skip_serializing_if = "Option::is_none")]
    pub message: Option<String>,
}

#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct CheckResults {
    pub results: BTreeMap<String, CheckResult>,
}

impl CheckResults {
    pub fn all_up(&self) -> bool {
        self.results.values().all(|result| result.up)
    }
}

/// A set of named checks
#[derive(Default)]
pub struct Checks {
    checks: RwLock<BTreeMap<String, Arc<dyn DynCheck>>>,
}

impl Checks {
    pub fn register(&self, name: impl Into<String>, check: impl Check) {
        self.checks.write().insert(name.into(), Arc::new(check));
    }

    pub async fn run(&self) -> CheckResults {
        // don't hold the lock while running the checks
        let checks = self
            .checks
            .read()
            .iter()
            .map(|(name, check)| (name.clone(), check.clone()))
            .collect::<Vec<_>>();

        let mut results = BTreeMap::new();
        for (name, check) in checks {
            let result = match check.run_dyn().await {
                Ok(()) => CheckResult {
                    up: true,
                    message: None,
                },
                Err(message) => CheckResult {
                    up: false,
                    message: Some(message),
                },
            };
            results.insert(name, result);
        }

        CheckResults { results }
    }
}

#[derive(Default)]
pub struct HealthChecks {
    pub liveness: Checks,
    pub readiness: Checks,
}
