//! Components command - list bundled components and their apply steps

use std::io::Write;

use console::style;
use kubeseed_kube::bundled;

use crate::error::Result;

pub fn run(out: &mut impl Write) -> Result<()> {
    for component in bundled() {
        let spec = component.layout()?;
        writeln!(
            out,
            "{} ({} resources)",
            style(component.name()).cyan().bold(),
            spec.resource_count()
        )?;

        for group in spec.groups() {
            writeln!(out, "  {}", style(group.step_name()).bold())?;
            for manifest in &group.manifests {
                writeln!(out, "    {}", manifest.path)?;
            }
        }
    }
    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_lists_every_component_with_steps() {
        let mut out = Vec::new();
        run(&mut out).unwrap();
        let output = console::strip_ansi_codes(&String::from_utf8(out).unwrap()).into_owned();

        assert!(output.contains("service-ca (9 resources)"));
        assert!(output.contains("ingress (10 resources)"));
        assert!(output.contains("dns (9 resources)"));
        assert!(output.contains("  daemon-sets\n"));
        assert!(output.contains("    assets/components/openshift-dns/dns/service.yaml"));
    }
}
