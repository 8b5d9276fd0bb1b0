//! LinuxHostNetwork driven by a scripted command runner

use std::collections::HashMap;
use std::sync::{Arc, Mutex};
use std::time::Duration;

use azone_core::abstractions::HostNetwork;
use azone_core::{AzoneError, AzoneResult, ErrorKind, NetworkConfig, Subnet, SubnetUtils};
use azone_host::{CommandOutput, CommandRunner, LinuxHostNetwork};
use pretty_assertions::assert_eq;

/// Answers commands from a table keyed by the full command line and records
/// every call.
#[derive(Default)]
struct ScriptedRunner {
    responses: HashMap<String, CommandOutput>,
    calls: Mutex<Vec<String>>,
}

impl ScriptedRunner {
    fn respond(mut self, command: &str, output: CommandOutput) -> Self {
        self.responses.insert(command.to_string(), output);
        self
    }

    fn calls(&self) -> Vec<String> {
        self.calls.lock().unwrap().clone()
    }
}

impl CommandRunner for ScriptedRunner {
    fn run(&self, program: &str, args: &[&str]) -> AzoneResult<CommandOutput> {
        let line = std::iter::once(program)
            .chain(args.iter().copied())
            .collect::<Vec<_>>()
            .join(" ");
        self.calls.lock().unwrap().push(line.clone());
        self.responses
            .get(&line)
            .cloned()
            .ok_or_else(|| AzoneError::HostCommand {
                command: line,
                details: "not scripted".to_string(),
            })
    }
}

const ADDRESSES: &str = "\
1: lo    inet 127.0.0.1/8 scope host lo\\       valid_lft forever preferred_lft forever
2: eth0    inet 10.97.3.20/24 brd 10.97.3.255 scope global eth0\\       valid_lft forever preferred_lft forever
";

fn subnet(s: &str) -> Subnet {
    s.parse().unwrap()
}

fn host(runner: ScriptedRunner) -> (Arc<ScriptedRunner>, LinuxHostNetwork) {
    let runner = Arc::new(runner);
    let host = LinuxHostNetwork::with_runner(runner.clone(), Duration::from_millis(500));
    (runner, host)
}

#[test]
fn test_subnet_in_use_checks_interfaces() {
    let (_, host) = host(ScriptedRunner::default().respond("ip -o -4 addr show", CommandOutput::ok(ADDRESSES)));

    assert!(host.subnet_in_use(&subnet("10.97.3.0/24")));
    assert!(host.subnet_in_use(&subnet("127.0.0.0/16")));
    assert!(!host.subnet_in_use(&subnet("10.97.4.0/24")));
}

#[test]
fn test_failed_listing_assumes_free() {
    let (_, host) = host(ScriptedRunner::default().respond(
        "ip -o -4 addr show",
        CommandOutput::failed(1, "RTNETLINK answers: Operation not permitted"),
    ));
    assert!(!host.subnet_in_use(&subnet("10.97.3.0/24")));

    let err = host.interface_addresses().unwrap_err();
    assert_eq!(err.kind(), ErrorKind::Runtime);
}

#[test]
fn test_gateway_ping() {
    let (runner, host) = host(
        ScriptedRunner::default()
            .respond("ping -c 1 -W 1 10.97.3.1", CommandOutput::ok("1 packets transmitted, 1 received"))
            .respond("ping -c 1 -W 1 10.97.9.1", CommandOutput::failed(1, "")),
    );

    assert!(host.gateway_reachable("10.97.3.1".parse().unwrap()));
    assert!(!host.gateway_reachable("10.97.9.1".parse().unwrap()));
    // Unscripted means the runner could not start ping at all.
    assert!(!host.gateway_reachable("10.97.10.1".parse().unwrap()));
    assert_eq!(runner.calls().len(), 3);
}

#[test]
fn test_bridge_subnet() {
    let (_, host) = host(
        ScriptedRunner::default()
            .respond(
                "ip -o -4 addr show dev azbr0",
                CommandOutput::ok(
                    "5: azbr0    inet 10.97.42.1/24 brd 10.97.42.255 scope global azbr0\\       valid_lft forever preferred_lft forever\n",
                ),
            )
            .respond(
                "ip -o -4 addr show dev azbr1",
                CommandOutput::failed(1, "Device \"azbr1\" does not exist.\n"),
            )
            .respond("ip -o -4 addr show dev azbr2", CommandOutput::ok(""))
            .respond(
                "ip -o -4 addr show dev azbr3",
                CommandOutput::failed(255, "Error: permission denied"),
            ),
    );

    assert_eq!(host.bridge_subnet("azbr0").unwrap(), Some(subnet("10.97.42.1/24")));
    assert_eq!(host.bridge_subnet("azbr1").unwrap(), None);
    assert_eq!(host.bridge_subnet("azbr2").unwrap(), None);
    assert!(matches!(
        host.bridge_subnet("azbr3").unwrap_err(),
        AzoneError::HostCommand { .. }
    ));
}

#[test]
fn test_subnet_utils_skips_host_subnets() {
    let (_, host) = host(
        ScriptedRunner::default()
            .respond("ip -o -4 addr show", CommandOutput::ok(ADDRESSES))
            .respond("ping -c 1 -W 1 10.97.4.1", CommandOutput::failed(1, "")),
    );

    struct Fixed(Mutex<Vec<u64>>);
    impl azone_core::abstractions::RandomSource for Fixed {
        fn random_int(&self, _low: u64, _high: u64) -> u64 {
            self.0.lock().unwrap().remove(0)
        }
    }

    let utils = SubnetUtils::new(
        Arc::new(host),
        Arc::new(Fixed(Mutex::new(vec![3, 4]))),
        &NetworkConfig::default(),
    );
    let picked = utils
        .generate_random_subnet(24, &subnet("10.97.0.0/16"))
        .unwrap();
    assert_eq!(picked, subnet("10.97.4.0/24"));
}
