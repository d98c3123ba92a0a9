//! iPXE script rendering
//!
//! Three outcomes:
//! - a normal script built from the selected configuration
//! - the minimal script, sent when the node or its configuration cannot be
//!   resolved; it names only the identifier
//! - the error script, sent when a configuration was found but could not be
//!   turned into a script; it carries the failure message
//!
//! Rendering never fails outward. Every path yields bootable text.

use std::fmt::Write as _;

use crds::{BootConfiguration, NodeSpec};
use kube::ResourceExt;

use crate::error::BootScriptError;

const IDENTIFIER_PLACEHOLDER: &str = "{{identifier}}";
const ERROR_PLACEHOLDER: &str = "{{error}}";

/// Sent when a node or its configuration cannot be resolved
pub const MINIMAL_TEMPLATE: &str = "#!ipxe

echo No boot configuration available for {{identifier}}
echo Retrying in 30 seconds
sleep 30
reboot
";

/// Sent when a configuration was found but script generation failed
pub const ERROR_TEMPLATE: &str = "#!ipxe

echo Boot script generation failed: {{error}}
echo Retrying in 60 seconds
sleep 60
reboot
";

/// How a script was produced
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ScriptKind {
    /// Rendered from a configuration for this request
    Rendered,
    /// Served from the result cache
    Cached,
    /// Minimal fallback
    Minimal,
    /// Error fallback
    Error,
}

/// A script plus how it was produced
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct BootScript {
    pub kind: ScriptKind,
    pub body: String,
}

impl BootScript {
    pub fn into_body(self) -> String {
        self.body
    }
}

/// Substituted text stays on one line so it cannot add script commands.
fn single_line(value: &str) -> String {
    value.replace(['\r', '\n'], " ")
}

pub fn minimal_script(identifier: &str) -> String {
    MINIMAL_TEMPLATE.replace(IDENTIFIER_PLACEHOLDER, &single_line(identifier))
}

pub fn error_script(message: &str) -> String {
    ERROR_TEMPLATE.replace(ERROR_PLACEHOLDER, &single_line(message))
}

fn check_field(config: &str, field: &str, value: &str) -> Result<(), BootScriptError> {
    if value.contains(['\r', '\n']) {
        return Err(BootScriptError::RenderFailure(format!(
            "configuration {config}: {field} contains a line break"
        )));
    }
    Ok(())
}

/// Build the normal script for `node` from `config`
pub fn render_config(config: &BootConfiguration, node: &NodeSpec) -> Result<String, BootScriptError> {
    let name = config.name_any();
    let spec = &config.spec;

    let kernel = spec.kernel.trim();
    if kernel.is_empty() {
        return Err(BootScriptError::RenderFailure(format!("configuration {name} has no kernel")));
    }
    check_field(&name, "kernel", kernel)?;
    check_field(&name, "params", &spec.params)?;
    let initrd = spec.initrd.as_deref().map(str::trim).filter(|i| !i.is_empty());
    if let Some(initrd) = initrd {
        check_field(&name, "initrd", initrd)?;
    }
    check_field(&name, "node xname", &node.xname)?;

    let mut script = String::from("#!ipxe\n");
    // Writing to a String cannot fail
    let _ = writeln!(script, "# node {} configuration {}", node.xname, name);
    let _ = writeln!(script, "set xname {}", node.xname);
    if let Some(nid) = node.nid {
        let _ = writeln!(script, "set nid {nid}");
    }

    let mut kernel_line = format!("kernel --name kernel {kernel}");
    if initrd.is_some() {
        kernel_line.push_str(" initrd=initrd");
    }
    let params = spec.params.trim();
    if !params.is_empty() {
        kernel_line.push(' ');
        kernel_line.push_str(params);
    }
    script.push_str(&kernel_line);
    script.push('\n');

    if let Some(initrd) = initrd {
        let _ = writeln!(script, "initrd --name initrd {initrd}");
    }
    script.push_str("boot || goto boot_failed\n\n:boot_failed\n");
    let _ = writeln!(script, "echo Boot failed for {}, rebooting in 30 seconds", node.xname);
    script.push_str("sleep 30\nreboot\n");

    Ok(script)
}

/// Pick and produce the right kind of script
///
/// A failure reason always yields the error script. A configuration and node
/// yield a normal script, or the error script if that cannot be built.
/// Anything else yields the minimal script for `identifier`.
pub fn render(
    config: Option<&BootConfiguration>,
    node: Option<&NodeSpec>,
    identifier: &str,
    failure: Option<&str>,
) -> BootScript {
    if let Some(reason) = failure {
        return BootScript {
            kind: ScriptKind::Error,
            body: error_script(reason),
        };
    }

    match (config, node) {
        (Some(config), Some(node)) => match render_config(config, node) {
            Ok(body) => BootScript {
                kind: ScriptKind::Rendered,
                body,
            },
            Err(e) => BootScript {
                kind: ScriptKind::Error,
                body: error_script(&e.to_string()),
            },
        },
        _ => BootScript {
            kind: ScriptKind::Minimal,
            body: minimal_script(identifier),
        },
    }
}
