//! In-process stand-ins for cmake, xcodebuild and lipo used by unit tests.

use std::cell::RefCell;
use std::fs;
use std::path::Path;

use crate::builders::ios::IOS_DEVICE;
use crate::tools::{Invocation, ToolRunner};
use crate::types::PackError;

/// Records every invocation. xcodebuild calls fabricate the configured
/// libraries in the directory layout Xcode uses; lipo calls concatenate
/// their inputs.
#[derive(Debug, Default)]
pub(crate) struct FakeRunner {
    calls: RefCell<Vec<Invocation>>,
    fail: Option<String>,
    xcode_libs: Vec<String>,
}

impl FakeRunner {
    pub(crate) fn failing(tool: &str) -> Self {
        Self {
            fail: Some(tool.to_string()),
            ..Self::default()
        }
    }

    pub(crate) fn with_xcode_output(libs: &[&str]) -> Self {
        Self {
            xcode_libs: libs.iter().map(|l| l.to_string()).collect(),
            ..Self::default()
        }
    }

    pub(crate) fn calls(&self) -> Vec<Invocation> {
        self.calls.borrow().clone()
    }

    fn xcodebuild(&self, inv: &Invocation) -> Result<(), PackError> {
        let args = inv.args_lossy();
        let sdk = args
            .iter()
            .position(|a| a == "-sdk")
            .and_then(|i| args.get(i + 1))
            .map(String::as_str);
        let target = inv.cwd.file_name().and_then(|n| n.to_str()).unwrap_or_default();

        for lib in &self.xcode_libs {
            match sdk {
                Some("iphoneos") => {
                    let objects = inv.cwd.join("BULLET_PHYSICS.build/Release-iphoneos/Bullet.build/Objects-normal");
                    for arch in IOS_DEVICE.archs {
                        write(&objects.join(arch).join(lib), arch)?;
                    }
                    write(&inv.cwd.join("src/Release-iphoneos").join(lib), "fat")?;
                }
                Some(_) => {
                    let arch = if target == "SIMULATOR" { "i386" } else { "x86_64" };
                    write(&inv.cwd.join("src/Release-iphonesimulator").join(lib), arch)?;
                    write(&inv.cwd.join("Objects-normal").join(arch).join(lib), "thin")?;
                }
                None => write(&inv.cwd.join("src/Release").join(lib), "x86_64")?,
            }
        }
        Ok(())
    }
}

fn write(path: &Path, contents: &str) -> Result<(), PackError> {
    if let Some(parent) = path.parent() {
        fs::create_dir_all(parent)?;
    }
    fs::write(path, contents)?;
    Ok(())
}

fn lipo(inv: &Invocation) -> Result<(), PackError> {
    let args = inv.args_lossy();
    let output_at = args
        .iter()
        .position(|a| a == "-output")
        .ok_or_else(|| PackError::Build("lipo: missing -output".into()))?;

    let mut merged = String::new();
    for input in &args[1..output_at] {
        let slice = fs::read_to_string(inv.cwd.join(input)).map_err(|e| PackError::Tool {
            tool: "lipo".into(),
            status: "exit status: 1".into(),
            stdout: String::new(),
            stderr: format!("can't open input file: {} ({})", input, e),
        })?;
        merged.push_str(&slice);
    }
    fs::write(inv.cwd.join(&args[output_at + 1]), merged)?;
    Ok(())
}

impl ToolRunner for FakeRunner {
    fn run(&self, invocation: &Invocation) -> Result<(), PackError> {
        self.calls.borrow_mut().push(invocation.clone());

        if self.fail.as_deref() == Some(invocation.tool_name()) {
            return Err(PackError::Tool {
                tool: invocation.tool_name().to_string(),
                status: "exit status: 65".into(),
                stdout: String::new(),
                stderr: "** BUILD FAILED **".into(),
            });
        }

        match invocation.tool_name() {
            "xcodebuild" => self.xcodebuild(invocation),
            "lipo" => lipo(invocation),
            _ => Ok(()),
        }
    }
}
