//! Assembly and packaging of the third party.
//!
//! The package directory `<name>/` (with `include/` and `lib/`) is zipped so
//! that the archive's single top-level entry is `<name>/`, and a
//! `<name>.ThirdParty.xml` manifest is written next to it. Both are then
//! copied to the output directory.
//!
//! The manifest's library list is a fixed template: it does not depend on
//! which libraries the build actually produced. [`manifest_mismatches`]
//! reports the difference so it can be logged.

use std::collections::BTreeSet;
use std::fs::{self, File};
use std::io::{self, Write};
use std::path::{Component, Path, PathBuf};

use walkdir::WalkDir;
use zip::write::SimpleFileOptions;
use zip::{CompressionMethod, ZipWriter};

use crate::types::PackError;

/// `name` attribute of the manifest's root element.
pub const MANIFEST_LIB_NAME: &str = "Bullet";

/// Include path advertised by the manifest.
pub const MANIFEST_INCLUDE_PATH: &str = "${Lib}/include";

/// Libraries listed by the manifest, in order.
pub const MANIFEST_LIBRARIES: [&str; 11] = [
    "libBullet2FileLoader.a",
    "libBullet3Collision.a",
    "libBullet3Common.a",
    "libBullet3Dynamics.a",
    "libBullet3Geometry.a",
    "libBullet3OpenCL_clew.a",
    "libBulletCollision.a",
    "libBulletDynamics.a",
    "libBulletInverseDynamics.a",
    "libBulletSoftBody.a",
    "libLinearMath.a",
];

/// Suffix of the manifest file name.
pub const MANIFEST_SUFFIX: &str = ".ThirdParty.xml";

/// Subdirectory of the working tree holding the per-target build dirs and
/// the staging dir.
pub const BUILD_SUBDIR: &str = "build";

/// Subdirectory of the working tree holding the package dir, the archive and
/// the manifest. Never shares a parent with the build or staging dirs.
pub const PACKAGE_SUBDIR: &str = "package";

/// Paths of the working tree for one run.
#[derive(Debug, Clone)]
pub struct PackageLayout {
    /// Root of the ephemeral tree.
    pub working_dir: PathBuf,
    /// `<working>/build`, parent of every target's build dir.
    pub build_root: PathBuf,
    /// Extracted per-architecture and merged libraries.
    pub staging_dir: PathBuf,
    /// `<working>/package/<name>`, the directory that is zipped.
    pub package_dir: PathBuf,
    /// `<package>/include`
    pub include_dir: PathBuf,
    /// `<package>/lib`
    pub lib_dir: PathBuf,
    /// `<working>/package/<name>.zip`
    pub archive_path: PathBuf,
    /// `<working>/package/<name>.ThirdParty.xml`
    pub manifest_path: PathBuf,
}

impl PackageLayout {
    /// Computes the layout for `name` under `working_dir`.
    ///
    /// `name` must be a single path component; see [`validate_third_party_name`].
    ///
    /// ```
    /// use bulletpack_sdk::package::PackageLayout;
    /// use std::path::Path;
    ///
    /// let layout = PackageLayout::new(Path::new("/tmp/w"), "Foo");
    /// assert_eq!(layout.staging_dir, Path::new("/tmp/w/build/staging"));
    /// assert_eq!(layout.lib_dir, Path::new("/tmp/w/package/Foo/lib"));
    /// assert_eq!(layout.archive_path, Path::new("/tmp/w/package/Foo.zip"));
    /// assert_eq!(layout.manifest_path, Path::new("/tmp/w/package/Foo.ThirdParty.xml"));
    /// ```
    pub fn new(working_dir: &Path, name: &str) -> Self {
        let build_root = working_dir.join(BUILD_SUBDIR);
        let package_root = working_dir.join(PACKAGE_SUBDIR);
        let package_dir = package_root.join(name);
        Self {
            working_dir: working_dir.to_path_buf(),
            staging_dir: build_root.join("staging"),
            build_root,
            include_dir: package_dir.join("include"),
            lib_dir: package_dir.join("lib"),
            archive_path: package_root.join(format!("{}.zip", name)),
            manifest_path: package_root.join(format!("{}{}", name, MANIFEST_SUFFIX)),
            package_dir,
        }
    }
}

/// Checks that `name` can be used as the archive's top-level directory.
///
/// The name must be one plain path component: not empty, not `.` or `..`,
/// and without separators.
///
/// ```
/// use bulletpack_sdk::package::validate_third_party_name;
///
/// assert!(validate_third_party_name("Bullet-2.86.1-iOS").is_ok());
/// assert!(validate_third_party_name("").is_err());
/// assert!(validate_third_party_name("a/b").is_err());
/// ```
pub fn validate_third_party_name(name: &str) -> Result<(), PackError> {
    let mut components = Path::new(name).components();
    match (components.next(), components.next()) {
        (Some(Component::Normal(first)), None) if first == name => Ok(()),
        _ => Err(PackError::Config(format!(
            "invalid third party name '{}'; expected a single, non-empty file name",
            name
        ))),
    }
}

/// Copies every file of the staging directory into `lib_dir`.
///
/// # Returns
/// The installed file names, sorted.
pub fn install_libs(staging_dir: &Path, lib_dir: &Path) -> Result<Vec<String>, PackError> {
    fs::create_dir_all(lib_dir).map_err(PackError::fs("create directory", lib_dir))?;

    let mut installed = Vec::new();
    for entry in fs::read_dir(staging_dir).map_err(PackError::fs("read directory", staging_dir))? {
        let entry = entry.map_err(PackError::fs("read directory", staging_dir))?;
        let path = entry.path();
        if !path.is_file() {
            continue;
        }
        let dest = lib_dir.join(entry.file_name());
        fs::copy(&path, &dest).map_err(PackError::fs("copy library to", &dest))?;
        installed.push(entry.file_name().to_string_lossy().into_owned());
    }
    installed.sort();
    Ok(installed)
}

/// Zips `package_dir` into `archive_path`.
///
/// Every entry is rooted at the package directory's own name, so extracting
/// the archive recreates `<name>/` exactly.
pub fn create_archive(package_dir: &Path, archive_path: &Path) -> Result<(), PackError> {
    let root_name = package_dir
        .file_name()
        .and_then(|n| n.to_str())
        .ok_or_else(|| {
            PackError::Build(format!(
                "Invalid package directory: {}",
                package_dir.display()
            ))
        })?;

    let file = File::create(archive_path).map_err(PackError::fs("create archive", archive_path))?;
    let mut zip = ZipWriter::new(file);
    let options = SimpleFileOptions::default()
        .compression_method(CompressionMethod::Deflated)
        .compression_level(Some(6));

    for entry in WalkDir::new(package_dir).sort_by_file_name().follow_links(false) {
        let entry = entry?;
        let relative = entry
            .path()
            .strip_prefix(package_dir)
            .map_err(|e| PackError::Build(format!("Failed to compute relative path: {}", e)))?;

        let mut archive_name = root_name.to_string();
        for component in relative.components() {
            archive_name.push('/');
            archive_name.push_str(&component.as_os_str().to_string_lossy());
        }

        if entry.file_type().is_dir() {
            zip.add_directory(format!("{}/", archive_name), options)?;
            continue;
        }

        #[cfg(unix)]
        let options = {
            use std::os::unix::fs::PermissionsExt;
            let mode = entry
                .metadata()?
                .permissions()
                .mode();
            options.unix_permissions(mode)
        };

        zip.start_file(archive_name, options)?;
        let mut source = File::open(entry.path()).map_err(PackError::fs("open", entry.path()))?;
        io::copy(&mut source, &mut zip)?;
    }

    zip.finish()?.flush()?;
    Ok(())
}

/// Renders the manifest for the archive `name`.
///
/// Only the `archive` attribute varies; the library list is fixed.
pub fn render_manifest(name: &str) -> String {
    let libraries: String = MANIFEST_LIBRARIES
        .iter()
        .map(|lib| format!("    <Library name=\"${{Lib}}/lib/{}\" />\n", lib))
        .collect();

    format!(
        r#"<ThirdPartyLib name="{lib_name}" archive="{archive}">
  <IncludePaths>
    <IncludePath path="{include_path}" />
  </IncludePaths>

  <Libraries>
{libraries}  </Libraries>
</ThirdPartyLib>
"#,
        lib_name = MANIFEST_LIB_NAME,
        archive = escape_attr(name),
        include_path = MANIFEST_INCLUDE_PATH,
        libraries = libraries,
    )
}

/// Writes the rendered manifest to `path`.
pub fn write_manifest(path: &Path, name: &str) -> Result<(), PackError> {
    fs::write(path, render_manifest(name)).map_err(PackError::fs("write manifest", path))
}

/// Manifest libraries that are not among `discovered`.
pub fn manifest_mismatches<'a, I>(discovered: I) -> Vec<&'static str>
where
    I: IntoIterator<Item = &'a String>,
{
    let discovered: BTreeSet<&str> = discovered.into_iter().map(String::as_str).collect();
    MANIFEST_LIBRARIES
        .iter()
        .copied()
        .filter(|lib| !discovered.contains(lib))
        .collect()
}

/// Copies the archive and manifest into `output_dir`, overwriting existing files.
///
/// # Returns
/// The destination paths of the archive and the manifest.
pub fn copy_to_output_dir(layout: &PackageLayout, output_dir: &Path) -> Result<(PathBuf, PathBuf), PackError> {
    fs::create_dir_all(output_dir).map_err(PackError::fs("create output directory", output_dir))?;

    let archive = copy_into(&layout.archive_path, output_dir)?;
    let manifest = copy_into(&layout.manifest_path, output_dir)?;
    Ok((archive, manifest))
}

fn copy_into(src: &Path, dir: &Path) -> Result<PathBuf, PackError> {
    let file_name = src
        .file_name()
        .ok_or_else(|| PackError::Build(format!("Invalid artifact path: {}", src.display())))?;
    let dest = dir.join(file_name);
    fs::copy(src, &dest).map_err(PackError::fs("copy artifact to", &dest))?;
    Ok(dest)
}

fn escape_attr(value: &str) -> String {
    let mut escaped = String::with_capacity(value.len());
    for c in value.chars() {
        match c {
            '&' => escaped.push_str("&amp;"),
            '<' => escaped.push_str("&lt;"),
            '>' => escaped.push_str("&gt;"),
            '"' => escaped.push_str("&quot;"),
            c => escaped.push(c),
        }
    }
    escaped
}
