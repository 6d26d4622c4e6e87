mod editing;

use std::sync::Arc;

use super::Editor;
use crate::config::Config;
use crate::test_support::FakeLoader;

fn fake_editor(config: Config) -> Editor {
    Editor::with_loader(config, Arc::new(FakeLoader::default()))
        .expect("editor should start")
        .with_seed(7)
}
