use async_trait::async_trait;
use miniflow_core::{keys, Node, NodeContext, NodeError, NodeKind};
use miniflow_runtime::{ConfigKey, NodeFactory, NodeMetadata};
use std::path::{Path, PathBuf};

/// Creates `folderPath/folderName`, parents included. Existing directories are fine.
pub struct CreateFolderNode;

#[async_trait]
impl Node for CreateFolderNode {
    fn kind(&self) -> NodeKind {
        NodeKind::CreateFolder
    }

    async fn execute(&self, ctx: &mut NodeContext<'_>) -> Result<(), NodeError> {
        let config = ctx.config();
        let name = config.require_str("folderName")?;
        let parent = config.require_str("folderPath")?;

        let dir = absolute(&Path::new(parent).join(name))?;

        tokio::fs::create_dir_all(&dir).await.map_err(|e| {
            NodeError::Filesystem(format!("Could not create folder {}: {}", dir.display(), e))
        })?;

        let dir = dir.to_string_lossy().into_owned();
        ctx.events.info(format!("Folder ready: {}", dir));
        ctx.variables.set(keys::LAST_CREATED_FOLDER, dir);

        Ok(())
    }
}

fn absolute(path: &Path) -> Result<PathBuf, NodeError> {
    if path.is_absolute() {
        return Ok(path.to_path_buf());
    }

    let cwd = std::env::current_dir()
        .map_err(|e| NodeError::Filesystem(format!("Cannot resolve working directory: {}", e)))?;
    Ok(cwd.join(path))
}

pub struct CreateFolderNodeFactory;

impl NodeFactory for CreateFolderNodeFactory {
    fn create(&self) -> Result<Box<dyn Node>, NodeError> {
        Ok(Box::new(CreateFolderNode))
    }

    fn kind(&self) -> NodeKind {
        NodeKind::CreateFolder
    }

    fn metadata(&self) -> NodeMetadata {
        NodeMetadata {
            description: "Create a directory (and its parents) if missing".to_string(),
            category: "filesystem".to_string(),
            config_keys: vec![
                ConfigKey::required("folderName", "Name of the directory to create"),
                ConfigKey::required("folderPath", "Parent directory"),
            ],
        }
    }
}
