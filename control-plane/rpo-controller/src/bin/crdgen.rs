use kube::core::CustomResourceExt;
use rpo_controller::crd::{Environment, Promotion, PromotionTemplate};

fn main() {
    let crds = [
        Environment::crd(),
        Promotion::crd(),
        PromotionTemplate::crd(),
    ];
    for crd in crds {
        let yaml = serde_yaml::to_string(&crd).expect("serialize CRD to YAML");
        println!("---\n{}", yaml);
    }
}
