// ==========================================
// 零售订单管理系统 - 商品图片存储
// ==========================================
// 职责: 持久化上传图片，返回可写入 products.image 的路径
// 说明: 图片变更不参与库存不变量；删除失败由调用方记录 warn
// ==========================================

use std::error::Error;
use std::fs;
use std::path::{Path, PathBuf};

pub type ImageStoreError = Box<dyn Error + Send + Sync>;

/// 图片存储 Trait
pub trait ImageStore: Send + Sync {
    /// 保存图片，返回存储路径
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, ImageStoreError>;

    /// 删除图片（不存在视为成功）
    fn remove(&self, path: &str) -> Result<(), ImageStoreError>;
}

/// 空操作存储（测试用）：只回显文件名
#[derive(Debug, Clone, Default)]
pub struct NoOpImageStore;

impl ImageStore for NoOpImageStore {
    fn store(&self, file_name: &str, _bytes: &[u8]) -> Result<String, ImageStoreError> {
        Ok(file_name.to_string())
    }

    fn remove(&self, _path: &str) -> Result<(), ImageStoreError> {
        Ok(())
    }
}

/// 本地文件系统存储，根目录为 uploads_dir
#[derive(Debug, Clone)]
pub struct FsImageStore {
    root: PathBuf,
}

impl FsImageStore {
    pub fn new(root: impl Into<PathBuf>) -> Self {
        Self { root: root.into() }
    }

    pub fn root(&self) -> &Path {
        &self.root
    }
}

/// 只保留文件名部分，拒绝路径穿越
fn sanitize_file_name(file_name: &str) -> Option<&str> {
    Path::new(file_name.trim())
        .file_name()
        .and_then(|n| n.to_str())
        .filter(|n| !n.is_empty() && *n != "." && *n != "..")
}

impl ImageStore for FsImageStore {
    fn store(&self, file_name: &str, bytes: &[u8]) -> Result<String, ImageStoreError> {
        let name = sanitize_file_name(file_name)
            .ok_or_else(|| format!("非法文件名: {file_name:?}"))?;
        fs::create_dir_all(&self.root)?;
        let path = self.root.join(name);
        fs::write(&path, bytes)?;
        Ok(path.to_string_lossy().into_owned())
    }

    fn remove(&self, path: &str) -> Result<(), ImageStoreError> {
        let path = Path::new(path);
        if path.exists() {
            fs::remove_file(path)?;
        }
        Ok(())
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_fs_store_and_remove() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path().join("uploads"));

        let path = store.store("milk.png", b"\x89PNG").unwrap();
        assert!(Path::new(&path).exists());
        assert_eq!(fs::read(&path).unwrap(), b"\x89PNG");

        store.remove(&path).unwrap();
        assert!(!Path::new(&path).exists());
        // 重复删除不报错
        store.remove(&path).unwrap();
    }

    #[test]
    fn test_fs_store_strips_directories() {
        let dir = tempfile::tempdir().unwrap();
        let store = FsImageStore::new(dir.path());

        let path = store.store("../../etc/cheese.jpg", b"x").unwrap();
        assert_eq!(Path::new(&path), dir.path().join("cheese.jpg"));
        assert!(store.store("..", b"x").is_err());
        assert!(store.store("  ", b"x").is_err());
    }
}
