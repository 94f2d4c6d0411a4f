//! Concatenates `a.txt` and `b.txt` into `build/both.txt`.
//!
//! ```text
//! cargo run --example concat -- list
//! cargo run --example concat -- concat
//! ```

use taskmill::{Dependency, Orchestrator, Task, TaskRegistry, TrackedFile};

fn main() -> anyhow::Result<()> {
    let _guard = taskmill::logging::init_tracing(false);

    let a = TrackedFile::new("a.txt");
    let b = TrackedFile::new("b.txt");
    let both = TrackedFile::new("build/both.txt");

    let registry = TaskRegistry::new()
        .with_task(
            Task::new("sources")
                .with_description("writes the sample inputs")
                .with_target(a.clone())
                .with_target(b.clone())
                .with_action(|| async {
                    tokio::fs::write("a.txt", "first\n").await?;
                    tokio::fs::write("b.txt", "second\n").await?;
                    Ok(())
                }),
        )?
        .with_task(
            Task::new("concat")
                .with_description("joins a.txt and b.txt")
                .with_dependencies([Dependency::File(a), Dependency::File(b)])
                .with_target(both.clone())
                .with_action(move || {
                    let out = both.path().to_path_buf();
                    async move {
                        let mut joined = tokio::fs::read_to_string("a.txt").await?;
                        joined.push_str(&tokio::fs::read_to_string("b.txt").await?);
                        if let Some(dir) = out.parent() {
                            tokio::fs::create_dir_all(dir).await?;
                        }
                        tokio::fs::write(&out, joined).await?;
                        Ok(())
                    }
                }),
        )?;

    std::process::exit(Orchestrator::new(registry).run(std::env::args()));
}
