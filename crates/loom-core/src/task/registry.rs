//! TaskRegistry - タスクの登録と検索
//!
//! # 実装詳細
//! - `HashMap<String, Arc<Task>>` で管理
//! - 同名の登録は後勝ち（置き換えられた Task を返し、warn ログを出す）
//! - 登録時にハンドラは実行されない

use std::collections::HashMap;
use std::sync::Arc;

use super::{Task, TaskSpec};

/// TaskRegistry は名前 → Task の対応表
///
/// # 使用例
/// ```ignore
/// let mut registry = TaskRegistry::new();
/// registry.register("add", add_spec);
///
/// let task = registry.lookup("add").unwrap();
/// assert_eq!(registry.names(), vec!["add"]);
/// ```
#[derive(Debug, Default)]
pub struct TaskRegistry {
    tasks: HashMap<String, Arc<Task>>,
}

impl TaskRegistry {
    pub fn new() -> Self {
        Self::default()
    }

    /// タスクを登録する。同名のタスクがあれば置き換えて、古い方を返す
    pub fn register(&mut self, name: impl Into<String>, spec: TaskSpec) -> Option<Arc<Task>> {
        let name = name.into();
        let task = Arc::new(Task::new(name.clone(), spec));
        let previous = self.tasks.insert(name.clone(), task);
        if previous.is_some() {
            tracing::warn!(task = %name, "task registered twice; the later definition wins");
        }
        previous
    }

    pub fn lookup(&self, name: &str) -> Option<Arc<Task>> {
        self.tasks.get(name).cloned()
    }

    pub fn contains(&self, name: &str) -> bool {
        self.tasks.contains_key(name)
    }

    /// 登録済みのタスク名（名前順）
    pub fn names(&self) -> Vec<&str> {
        let mut names: Vec<&str> = self.tasks.keys().map(String::as_str).collect();
        names.sort_unstable();
        names
    }

    /// 登録済みのタスク（名前順）
    pub fn tasks(&self) -> Vec<&Arc<Task>> {
        let mut tasks: Vec<&Arc<Task>> = self.tasks.values().collect();
        tasks.sort_unstable_by(|a, b| a.name().cmp(b.name()));
        tasks
    }

    pub fn len(&self) -> usize {
        self.tasks.len()
    }

    pub fn is_empty(&self) -> bool {
        self.tasks.is_empty()
    }
}

#[cfg(test)]
mod tests {
    use std::sync::atomic::{AtomicUsize, Ordering};

    use super::*;
    use crate::schema::Value;
    use crate::task::{DEFAULT_OUTPUT, TaskOutput};

    fn constant(value: &'static str) -> TaskSpec {
        TaskSpec::from_fn(move |_, _, _| async move { Ok(TaskOutput::single(value)) })
    }

    #[test]
    fn register_and_lookup() {
        let mut registry = TaskRegistry::new();
        assert!(registry.register("add", constant("5")).is_none());

        let task = registry.lookup("add").unwrap();
        assert_eq!(task.name(), "add");
        assert!(registry.contains("add"));
        assert!(registry.lookup("sub").is_none());
        assert_eq!(registry.len(), 1);
    }

    #[tokio::test]
    async fn later_registration_wins() {
        let mut registry = TaskRegistry::new();
        registry.register("foo", constant("first"));
        let replaced = registry.register("foo", constant("second"));

        assert_eq!(replaced.map(|t| t.name().to_string()), Some("foo".into()));
        assert_eq!(registry.len(), 1);

        let task = registry.lookup("foo").unwrap();
        let output = task
            .handler()
            .handle(Default::default(), Value::Void, task.effect().clone())
            .await
            .unwrap();
        assert_eq!(output.get(DEFAULT_OUTPUT), Some(&Value::from("second")));
    }

    #[test]
    fn names_are_sorted() {
        let mut registry = TaskRegistry::new();
        for name in ["echo", "add", "greet"] {
            registry.register(name, constant(name));
        }
        assert_eq!(registry.names(), vec!["add", "echo", "greet"]);
        let ordered: Vec<&str> = registry.tasks().iter().map(|t| t.name()).collect();
        assert_eq!(ordered, vec!["add", "echo", "greet"]);
    }

    #[test]
    fn registration_does_not_run_the_handler() {
        let calls = Arc::new(AtomicUsize::new(0));
        let counter = calls.clone();
        let spec = TaskSpec::from_fn(move |_, _, _| {
            counter.fetch_add(1, Ordering::SeqCst);
            async { Ok(TaskOutput::none()) }
        });

        let mut registry = TaskRegistry::new();
        registry.register("lazy", spec);
        assert_eq!(calls.load(Ordering::SeqCst), 0);
    }
}
