// ─── Classpath Builder ───
// Orders the jars handed to `-cp` and renders them for the host OS.

use std::path::{Path, PathBuf};

use tracing::debug;

use crate::core::libraries::ClasspathMap;
use crate::core::platform::OsFamily;

/// Classpath entries in launch order:
/// - the game jar
/// - resolved libraries, in first-declaration order
/// - every jar below `<jre>/lib/ext`
pub fn classpath_entries(
    client_jar: &Path,
    libraries: &ClasspathMap,
    jre_home: Option<&Path>,
) -> Vec<PathBuf> {
    let mut entries = vec![client_jar.to_path_buf()];
    entries.extend(libraries.paths().map(Path::to_path_buf));

    if let Some(home) = jre_home {
        let ext_dir = home.join("lib").join("ext");
        let mut ext_jars = Vec::new();
        collect_jars(&ext_dir, &mut ext_jars);
        ext_jars.sort();
        debug!("Adding {} JRE extension jars from {:?}", ext_jars.len(), ext_dir);
        entries.extend(ext_jars);
    }

    entries
}

/// Join entries with the OS classpath separator. Windows gets backslashes
/// throughout and no extended-length prefix, which Java rejects on `-cp`.
pub fn render_classpath(entries: &[PathBuf], os: OsFamily) -> String {
    let rendered: Vec<String> = entries
        .iter()
        .map(|entry| {
            let text = entry.to_string_lossy();
            match os {
                OsFamily::Windows => {
                    let text = text.strip_prefix(r"\\?\").unwrap_or(&*text);
                    text.replace('/', "\\")
                }
                _ => text.to_string(),
            }
        })
        .collect();
    rendered.join(os.classpath_separator())
}

fn collect_jars(dir: &Path, out: &mut Vec<PathBuf>) {
    let Ok(read_dir) = std::fs::read_dir(dir) else {
        return;
    };
    for entry in read_dir.flatten() {
        let path = entry.path();
        if path.is_dir() {
            collect_jars(&path, out);
        } else if path.extension().is_some_and(|ext| ext.eq_ignore_ascii_case("jar")) {
            out.push(path);
        }
    }
}
