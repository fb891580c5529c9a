//! 把 migrations/ 下的 `NNN_描述.sql` 嵌入二进制，供 `privchat-manager migrate` 使用。

use std::collections::BTreeMap;
use std::env;
use std::fs;
use std::io::{self, Write};
use std::path::{Path, PathBuf};

fn invalid(msg: String) -> io::Error {
    io::Error::new(io::ErrorKind::InvalidData, msg)
}

/// 解析文件名中的版本号，例如 `001_manager_tables.sql` -> (1, "001_manager_tables")
fn parse_migration_name(file_name: &str) -> io::Result<(u32, String)> {
    let stem = file_name
        .strip_suffix(".sql")
        .ok_or_else(|| invalid(format!("not a .sql file: {file_name}")))?;
    let version = stem
        .split('_')
        .next()
        .and_then(|v| v.parse::<u32>().ok())
        .ok_or_else(|| invalid(format!("migration must start with a numeric version: {file_name}")))?;
    Ok((version, stem.to_string()))
}

fn main() -> io::Result<()> {
    let migrations_dir = Path::new("migrations");
    let out_dir = PathBuf::from(env::var("OUT_DIR").map_err(|e| invalid(e.to_string()))?);
    println!("cargo:rerun-if-changed=migrations");

    // 版本号 -> (名称, 相对路径)
    let mut migrations: BTreeMap<u32, (String, String)> = BTreeMap::new();
    if migrations_dir.is_dir() {
        for entry in fs::read_dir(migrations_dir)? {
            let entry = entry?;
            let file_name = entry.file_name().to_string_lossy().into_owned();
            if !file_name.ends_with(".sql") {
                continue;
            }
            let (version, name) = parse_migration_name(&file_name)?;
            let path = format!("migrations/{file_name}");
            if let Some((existing, _)) = migrations.insert(version, (name.clone(), path)) {
                return Err(invalid(format!(
                    "duplicate migration version {version}: {existing} / {name}"
                )));
            }
        }
    }

    let entries: Vec<String> = migrations
        .iter()
        .map(|(version, (name, path))| {
            format!(
                "    ({version}, \"{name}\", include_str!(concat!(env!(\"CARGO_MANIFEST_DIR\"), \"/{path}\"))),"
            )
        })
        .collect();

    let mut f = fs::File::create(out_dir.join("manager_migrations.rs"))?;
    writeln!(f, "/// 计数器表与离线收件箱表迁移：(版本, 名称, SQL)，按版本升序")?;
    writeln!(f, "pub const MANAGER_MIGRATIONS: &[(u32, &str, &str)] = &[")?;
    for entry in &entries {
        writeln!(f, "{entry}")?;
    }
    writeln!(f, "];")?;
    Ok(())
}
