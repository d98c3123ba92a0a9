//! Prints the CRD manifests for `kubectl apply -f -`.

use crds::{BootConfiguration, Node};
use kube::CustomResourceExt;

fn main() -> anyhow::Result<()> {
    let manifests = [BootConfiguration::crd(), Node::crd()];
    for crd in manifests {
        println!("---");
        print!("{}", serde_yaml::to_string(&crd)?);
    }
    Ok(())
}
