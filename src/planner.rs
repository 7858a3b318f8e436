use serde::Serialize;

use crate::config::Config;
use crate::env_detect::PackageManager;
use crate::step::{CommandSpec, Step};

#[derive(Debug, Serialize)]
pub struct Plan {
    pub name: String,
    pub steps: Vec<PlannedStep>,
}

#[derive(Debug, Serialize)]
pub struct PlannedStep {
    pub index: usize,
    /// Banner printed once when execution enters a new group of steps.
    pub stage: String,
    pub description: String,
    pub step: Step,
}

pub struct PlanBuilder {
    name: String,
    stage: String,
    steps: Vec<PlannedStep>,
}

impl PlanBuilder {
    pub fn new(name: &str) -> Self {
        Self {
            name: name.to_string(),
            stage: String::new(),
            steps: Vec::new(),
        }
    }

    pub fn stage(&mut self, banner: &str) -> &mut Self {
        self.stage = banner.to_string();
        self
    }

    pub fn push(&mut self, step: Step) -> &mut Self {
        self.steps.push(PlannedStep {
            index: self.steps.len(),
            stage: self.stage.clone(),
            description: step.description(),
            step,
        });
        self
    }

    pub fn run(&mut self, command: CommandSpec) -> &mut Self {
        self.push(Step::run(command))
    }

    pub fn build(self) -> Plan {
        Plan {
            name: self.name,
            steps: self.steps,
        }
    }
}

/// Install host packages, create the kind cluster and deploy everything the
/// integration test talks to.
pub fn plan_prepare(config: &Config, package_manager: PackageManager) -> Plan {
    let mut plan = PlanBuilder::new("prepare environment");

    plan.stage("Installing dependencies...");
    for command in package_manager.install_commands() {
        plan.run(command);
    }

    plan.stage("Setting up Kind Kubernetes cluster...");
    plan.run(
        CommandSpec::from_words("kind create cluster --name").arg(config.cluster_name.as_str()),
    );

    plan.stage("Deploying local registry...");
    plan.run(CommandSpec::from_words(
        "kubectl create deployment registry --image=docker.io/registry",
    ));
    plan.run(wait_ready(config));
    plan.push(port_forward("registry", "deploy/registry", 5000));

    plan.stage("Deploying vSphere simulator...");
    plan.run(CommandSpec::from_words("make deploy-vsphere-simulator"));
    plan.run(wait_ready(config));
    plan.push(port_forward("vcsim", "deploy/vcsim", 8989));

    plan.stage("Building and deploying containers...");
    plan.run(
        CommandSpec::from_words("make migration-planner-agent-container")
            .arg(make_var("MIGRATION_PLANNER_AGENT_IMAGE", &config.agent_image)),
    );
    plan.run(
        CommandSpec::from_words("make migration-planner-api-container")
            .arg(make_var("MIGRATION_PLANNER_API_IMAGE", &config.api_image)),
    );
    plan.run(CommandSpec::from_words("docker push").arg(config.agent_image.as_str()));
    plan.run(CommandSpec::from_words("kind load docker-image").arg(config.api_image.as_str()));
    plan.run(CommandSpec::from_words("docker rmi").arg(config.api_image.as_str()));

    plan.stage("Deploying assisted migration planner...");
    plan.run(CommandSpec::from_words("make deploy-on-kind").args([
        make_var("MIGRATION_PLANNER_API_IMAGE", &config.api_image),
        make_var("MIGRATION_PLANNER_AGENT_IMAGE", &config.agent_image),
        make_var(
            "MIGRATION_PLANNER_API_IMAGE_PULL_POLICY",
            &config.api_image_pull_policy,
        ),
        make_var("INSECURE_REGISTRY", &config.insecure_registry),
        make_var("MIGRATION_PLANNER_NAMESPACE", &config.namespace),
        make_var("PERSISTENT_DISK_DEVICE", "/dev/vda"),
    ]));
    plan.run(wait_ready(config));
    plan.push(port_forward(
        "migration-planner-agent",
        "service/migration-planner-agent",
        7443,
    ));
    plan.push(port_forward(
        "migration-planner",
        "service/migration-planner",
        3443,
    ));

    plan.build()
}

/// Convert the persistence disk and run the integration suite against the planner.
pub fn plan_tests(config: &Config) -> Plan {
    let mut plan = PlanBuilder::new("run e2e test");

    plan.stage("Running integration tests...");
    plan.push(Step::CreateDir {
        path: config.work_dir.clone(),
    });
    plan.run(
        CommandSpec::from_words("qemu-img convert -f vmdk -O qcow2")
            .arg(config.disk_image.to_string_lossy())
            .arg(config.converted_disk().to_string_lossy()),
    );
    plan.run(
        CommandSpec::from_words("sudo make integration-test")
            .arg(make_var("PLANNER_IP", &config.registry_ip)),
    );

    plan.build()
}

/// Tear down port-forwards first, then the workloads and the cluster.
pub fn plan_clean(config: &Config) -> Plan {
    let mut plan = PlanBuilder::new("exit and clean");

    plan.stage("Delete cluster...");
    plan.push(Step::StopPortForwards);
    plan.run(CommandSpec::from_words("kubectl delete all --all"));
    plan.run(
        CommandSpec::from_words("kind delete cluster --name").arg(config.cluster_name.as_str()),
    );

    plan.build()
}

fn wait_ready(config: &Config) -> CommandSpec {
    CommandSpec::from_words("kubectl wait --for=condition=Ready pods --all")
        .arg(format!("--timeout={}s", config.wait_timeout_secs))
}

fn port_forward(name: &str, target: &str, port: u16) -> Step {
    Step::PortForward {
        name: name.to_string(),
        command: CommandSpec::from_words("kubectl port-forward --address 0.0.0.0")
            .arg(target)
            .arg(format!("{port}:{port}")),
    }
}

fn make_var(name: &str, value: &str) -> String {
    format!("{name}={value}")
}
