mod runtime;

pub use runtime::{
    azul_arch, azul_os, locate_java_binary, ArchiveKind, JavaBuild, JavaProvisioner, JavaRuntime,
    AZUL_METADATA_URL, DEFAULT_JRE_VERSION,
};
