use crate::adapter::{AdapterFactory, ComponentAdapter, PushParameters};
use crate::platform::{ComponentIdentity, PlatformContext};
use crate::process::LogStream;
use crate::RuntimeError;
use loam_schema::{Command, Devfile};
use std::collections::BTreeMap;
use std::io::Read;
use std::sync::{Arc, Mutex};

/// One recorded adapter invocation.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum AdapterCall {
    Push(PushParameters),
    Log { follow: bool, command: String },
    Delete { labels: BTreeMap<String, String>, show: bool },
    Exec(Vec<String>),
    Test { command_name: String, show: bool },
}

/// Canned results for a [`MockAdapter`]. A `Some` failure makes that verb fail
/// with the given message.
#[derive(Debug, Clone, Default)]
pub struct MockBehavior {
    pub fail_push: Option<String>,
    pub fail_log: Option<String>,
    pub fail_delete: Option<String>,
    pub fail_exec: Option<String>,
    pub fail_test: Option<String>,
    pub log_output: String,
    /// The log stream yields `log_output` and then fails with this message.
    pub fail_log_stream: Option<String>,
}

/// Log stream whose source dies once its output is exhausted.
struct FailingStream {
    output: std::io::Cursor<Vec<u8>>,
    message: String,
}

impl Read for FailingStream {
    fn read(&mut self, buf: &mut [u8]) -> std::io::Result<usize> {
        match self.output.read(buf)? {
            0 if !buf.is_empty() => Err(std::io::Error::other(self.message.clone())),
            n => Ok(n),
        }
    }
}

fn fail_if(failure: Option<&String>) -> Result<(), RuntimeError> {
    match failure {
        Some(msg) => Err(RuntimeError::ExecFailed(msg.clone())),
        None => Ok(()),
    }
}

pub struct MockAdapter {
    calls: Arc<Mutex<Vec<AdapterCall>>>,
    behavior: MockBehavior,
}

impl MockAdapter {
    fn record(&self, call: AdapterCall) -> Result<(), RuntimeError> {
        self.calls
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?
            .push(call);
        Ok(())
    }
}

impl ComponentAdapter for MockAdapter {
    fn push(&self, params: &PushParameters) -> Result<(), RuntimeError> {
        self.record(AdapterCall::Push(params.clone()))?;
        fail_if(self.behavior.fail_push.as_ref())
    }

    fn log(&self, follow: bool, command: &Command) -> Result<LogStream, RuntimeError> {
        self.record(AdapterCall::Log {
            follow,
            command: command.id.to_string(),
        })?;
        fail_if(self.behavior.fail_log.as_ref())?;
        let output = std::io::Cursor::new(self.behavior.log_output.clone().into_bytes());
        match &self.behavior.fail_log_stream {
            Some(message) => Ok(Box::new(FailingStream {
                output,
                message: message.clone(),
            })),
            None => Ok(Box::new(output)),
        }
    }

    fn delete(&self, labels: &BTreeMap<String, String>, show: bool) -> Result<(), RuntimeError> {
        self.record(AdapterCall::Delete {
            labels: labels.clone(),
            show,
        })?;
        fail_if(self.behavior.fail_delete.as_ref())
    }

    fn exec(&self, command: &[String]) -> Result<(), RuntimeError> {
        self.record(AdapterCall::Exec(command.to_vec()))?;
        fail_if(self.behavior.fail_exec.as_ref())
    }

    fn test(&self, command_name: &str, show: bool) -> Result<(), RuntimeError> {
        self.record(AdapterCall::Test {
            command_name: command_name.to_owned(),
            show,
        })?;
        fail_if(self.behavior.fail_test.as_ref())
    }
}

/// Factory handing out [`MockAdapter`]s that share one call log.
#[derive(Default)]
pub struct MockFactory {
    calls: Arc<Mutex<Vec<AdapterCall>>>,
    constructed: Mutex<Vec<PlatformContext>>,
    behavior: MockBehavior,
    construction_failure: Option<String>,
}

impl MockFactory {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn with_behavior(behavior: MockBehavior) -> Self {
        Self {
            behavior,
            ..Self::default()
        }
    }

    /// Every `new_adapter` call fails with `AdapterConstruction`.
    pub fn failing_construction(reason: &str) -> Self {
        Self {
            construction_failure: Some(reason.to_owned()),
            ..Self::default()
        }
    }

    pub fn calls(&self) -> Vec<AdapterCall> {
        self.calls.lock().map(|c| c.clone()).unwrap_or_default()
    }

    /// Platform contexts adapters were requested for, in order.
    pub fn constructed(&self) -> Vec<PlatformContext> {
        self.constructed
            .lock()
            .map(|c| c.clone())
            .unwrap_or_default()
    }
}

impl AdapterFactory for MockFactory {
    fn new_adapter(
        &self,
        _identity: &ComponentIdentity,
        _devfile: &Devfile,
        platform: &PlatformContext,
    ) -> Result<Box<dyn ComponentAdapter>, RuntimeError> {
        self.constructed
            .lock()
            .map_err(|e| RuntimeError::ExecFailed(format!("mutex poisoned: {e}")))?
            .push(platform.clone());
        if let Some(reason) = &self.construction_failure {
            return Err(RuntimeError::AdapterConstruction {
                platform: platform.name().to_owned(),
                reason: reason.clone(),
            });
        }
        Ok(Box::new(MockAdapter {
            calls: Arc::clone(&self.calls),
            behavior: self.behavior.clone(),
        }))
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn devfile() -> Devfile {
        loam_schema::parse_devfile_str(
            r#"
schema_version = "2.0.0"
[metadata]
name = "mock"
[[components]]
name = "runtime"
image = "alpine"
"#,
        )
        .unwrap()
    }

    #[test]
    fn adapters_share_the_call_log() {
        let factory = MockFactory::new();
        let id = ComponentIdentity::new("mock", "app", "/tmp");
        let a = factory
            .new_adapter(&id, &devfile(), &PlatformContext::LocalEngine)
            .unwrap();
        let b = factory
            .new_adapter(
                &id,
                &devfile(),
                &PlatformContext::Cluster {
                    namespace: "dev".to_owned(),
                },
            )
            .unwrap();
        a.exec(&["ls".to_owned()]).unwrap();
        b.test("", true).unwrap();

        assert_eq!(
            factory.constructed(),
            vec![
                PlatformContext::LocalEngine,
                PlatformContext::Cluster {
                    namespace: "dev".to_owned()
                },
            ]
        );
        assert_eq!(
            factory.calls(),
            vec![
                AdapterCall::Exec(vec!["ls".to_owned()]),
                AdapterCall::Test {
                    command_name: String::new(),
                    show: true
                },
            ]
        );
    }

    #[test]
    fn configured_failure_is_returned_after_recording() {
        let factory = MockFactory::with_behavior(MockBehavior {
            fail_exec: Some("boom".to_owned()),
            ..MockBehavior::default()
        });
        let id = ComponentIdentity::new("mock", "app", "/tmp");
        let adapter = factory
            .new_adapter(&id, &devfile(), &PlatformContext::LocalEngine)
            .unwrap();
        let err = adapter.exec(&["false".to_owned()]).unwrap_err();
        assert!(err.to_string().contains("boom"));
        assert_eq!(factory.calls().len(), 1);
    }

    #[test]
    fn construction_failure_is_recorded() {
        let factory = MockFactory::failing_construction("no cluster");
        let id = ComponentIdentity::new("mock", "app", "/tmp");
        let result = factory.new_adapter(&id, &devfile(), &PlatformContext::LocalEngine);
        assert!(matches!(
            result,
            Err(RuntimeError::AdapterConstruction { .. })
        ));
        assert_eq!(factory.constructed(), vec![PlatformContext::LocalEngine]);
    }
}
