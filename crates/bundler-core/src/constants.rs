/// File names searched for while profiling a source archive.
pub const DOCKER_FILE: &str = "Dockerfile";
pub const MIGRATIONS_DOCKER_FILE: &str = "migrations.Dockerfile";
/// Directory marking a Helm chart inside a repository.
pub const HELM_DIR: &str = "helm";

pub const SOURCE_CODE_ARCHIVE: &str = "source-code.tar.gz";
pub const MANIFEST_FILE: &str = "manifest.yaml";
pub const CHECKSUM_FILE_SUFFIX: &str = "-checksum.yaml";
pub const CHART_FILE: &str = "Chart.yaml";

pub const TAR_FORMAT: &str = "tar";
pub const TGZ_ARCHIVE_FORMAT: &str = "tgz";

/// Image tag used when a repository request names no ref.
pub const DEFAULT_TAG: &str = "latest";
