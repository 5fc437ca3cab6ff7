use k8s_openapi::{
    api::{
        batch::v1::{Job, JobSpec},
        core::v1::{Container, EnvVar, PodSpec, PodTemplateSpec},
    },
    apimachinery::pkg::apis::meta::v1::ObjectMeta,
};

use kjob_core::WorkloadSpec;

/// Render a workload as a `batch/v1` Job.
///
/// - Job name, pod template name and container name are the execution identifier
/// - the identifier labels go on both the Job and the pod template, so pods are
///   found with the same selector the Job was created with
/// - env vars keep the key order of the workload environment
pub fn build_job(spec: &WorkloadSpec) -> Job {
    let labels = Some(spec.labels.clone().into_inner());
    let env: Vec<EnvVar> = spec
        .env
        .iter()
        .map(|(name, value)| EnvVar {
            name: name.to_string(),
            value: Some(value.to_string()),
            ..EnvVar::default()
        })
        .collect();

    Job {
        metadata: ObjectMeta {
            name: Some(spec.id.to_string()),
            labels: labels.clone(),
            ..ObjectMeta::default()
        },
        spec: Some(JobSpec {
            active_deadline_seconds: spec.active_deadline_seconds(),
            template: PodTemplateSpec {
                metadata: Some(ObjectMeta {
                    name: Some(spec.id.to_string()),
                    labels,
                    ..ObjectMeta::default()
                }),
                spec: Some(PodSpec {
                    restart_policy: Some(spec.restart_policy.as_str().to_string()),
                    containers: vec![Container {
                        name: spec.id.to_string(),
                        image: Some(spec.image.clone()),
                        env: (!env.is_empty()).then_some(env),
                        ..Container::default()
                    }],
                    ..PodSpec::default()
                }),
            },
            ..JobSpec::default()
        }),
        ..Job::default()
    }
}
