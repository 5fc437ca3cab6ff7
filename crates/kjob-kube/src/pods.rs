use k8s_openapi::api::core::v1::Pod;

/// Pick the unit whose output is streamed.
///
/// A Job may leave more than one pod behind when its container was restarted
/// or rescheduled; the newest one by creation time is taken. Pods without a
/// name are ignored.
pub fn select_unit(pods: Vec<Pod>) -> Option<Pod> {
    pods.into_iter()
        .filter(|pod| pod.metadata.name.is_some())
        .max_by_key(|pod| pod.metadata.creation_timestamp.as_ref().map(|t| t.0))
}

#[cfg(test)]
mod tests {
    use super::*;

    fn pod(name: &str, created: &str) -> Pod {
        serde_json::from_value(serde_json::json!({
            "metadata": { "name": name, "creationTimestamp": created }
        }))
        .unwrap()
    }

    #[test]
    fn no_pods_no_unit() {
        assert!(select_unit(Vec::new()).is_none());
    }

    #[test]
    fn newest_pod_wins() {
        let pods = vec![
            pod("backup-1", "2024-05-01T10:00:00Z"),
            pod("backup-3", "2024-05-01T12:00:00Z"),
            pod("backup-2", "2024-05-01T11:00:00Z"),
        ];
        let unit = select_unit(pods).unwrap();
        assert_eq!(unit.metadata.name.as_deref(), Some("backup-3"));
    }

    #[test]
    fn unnamed_pods_are_skipped() {
        let unnamed: Pod = serde_json::from_value(serde_json::json!({
            "metadata": { "creationTimestamp": "2030-01-01T00:00:00Z" }
        }))
        .unwrap();
        let unit = select_unit(vec![unnamed, pod("backup-1", "2024-05-01T10:00:00Z")]).unwrap();
        assert_eq!(unit.metadata.name.as_deref(), Some("backup-1"));
    }
}
