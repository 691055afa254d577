//! namespace.rs
//! Maps a controller manager namespace to the namespace of one of its controllers,
//! and derives a controller's joint names from its state interfaces.

use crate::discovery::lister::ControllerInfo;

/// Resolve a controller's namespace from that of its controller manager.
///
/// Controllers live one level above the manager: `/path/to/controller_manager`
/// hosts `foo` at `/path/to/foo`. A manager in the root namespace (or with an
/// empty namespace) puts its controllers at `/foo`.
///
/// # Panics
/// Panics if `controller_name` is empty.
pub fn resolve(cm_ns: &str, controller_name: &str) -> String {
    assert!(!controller_name.is_empty(), "controller name must not be empty");

    let parent = match cm_ns.rfind('/') {
        Some(idx) => &cm_ns[..idx],
        None => cm_ns,
    };

    let mut ns = String::with_capacity(parent.len() + controller_name.len() + 1);
    ns.push_str(parent);
    if parent != "/" {
        ns.push('/');
    }
    ns.push_str(controller_name);
    ns
}

/// Joint name of an interface identifier such as `shoulder/position`.
pub fn joint_of_interface(interface: &str) -> &str {
    match interface.rfind('/') {
        Some(idx) => &interface[..idx],
        None => "",
    }
}

/// Ordered, deduplicated joint names of a controller.
pub fn joint_names(info: &ControllerInfo) -> Vec<String> {
    let mut names: Vec<String> = Vec::new();
    for interface in &info.required_state_interfaces {
        let name = joint_of_interface(interface);
        if !names.iter().any(|n| n == name) {
            names.push(name.to_string());
        }
    }
    names
}

#[cfg(test)]
mod tests {
    use super::*;
    use crate::discovery::lister::ControllerState;

    #[test]
    fn resolves_sibling_of_manager() {
        assert_eq!(resolve("/path/to/controller_manager", "foo"), "/path/to/foo");
        assert_eq!(resolve("/a/b/controller_manager", "c"), "/a/b/c");
    }

    #[test]
    fn resolves_root_and_empty_namespaces() {
        assert_eq!(resolve("/", "foo"), "/foo");
        assert_eq!(resolve("", "foo"), "/foo");
        assert_eq!(resolve("/controller_manager", "foo"), "/foo");
    }

    #[test]
    fn resolve_is_deterministic() {
        for cm_ns in ["/robot/controller_manager", "/cm", "/", ""] {
            let first = resolve(cm_ns, "arm_controller");
            assert_eq!(first, resolve(cm_ns, "arm_controller"));
            assert!(first.ends_with("/arm_controller"));
        }
    }

    #[test]
    #[should_panic(expected = "controller name must not be empty")]
    fn empty_controller_name_panics() {
        resolve("/cm", "");
    }

    #[test]
    fn joint_names_dedup_in_first_seen_order() {
        let info = ControllerInfo {
            name: "arm".into(),
            controller_type: "joint_trajectory_controller/JointTrajectoryController".into(),
            state: ControllerState::Active,
            required_state_interfaces: vec![
                "j1/position".into(),
                "j1/velocity".into(),
                "j2/position".into(),
            ],
        };
        assert_eq!(joint_names(&info), vec!["j1".to_string(), "j2".to_string()]);
    }

    #[test]
    fn nested_joint_names_keep_prefix() {
        assert_eq!(joint_of_interface("left/arm/j1/position"), "left/arm/j1");
    }
}
