//! Command handlers

use std::sync::Arc;

use azone_core::abstractions::ThreadRandom;
use azone_core::{AvailabilityZone, AvailabilityZoneManager, AzoneConfig, AzoneResult, SubnetUtils};
use tracing::info;

use crate::{Cli, Commands, SortKey, ZoneCommands};

pub(crate) fn run(cli: Cli) -> AzoneResult<()> {
    let mut config = AzoneConfig::load(cli.config.as_deref())?;
    if let Some(dir) = cli.data_dir {
        config.data_dir = dir;
    }
    if cli.no_host_probe {
        config.network.probe_host_network = false;
    }
    config.validate()?;

    match cli.command {
        Commands::Zones { command } => run_zones(&config, command),
        Commands::Subnet {
            bridge,
            network_dir,
        } => {
            let network_dir = network_dir.unwrap_or_else(|| config.data_dir.join("network"));
            let subnet = subnet_utils(&config).get_subnet(&network_dir, &bridge)?;
            println!("{}", subnet.canonical());
            Ok(())
        }
    }
}

fn subnet_utils(config: &AzoneConfig) -> SubnetUtils {
    SubnetUtils::new(
        azone_host::host_network(&config.network),
        Arc::new(ThreadRandom::new()),
        &config.network,
    )
}

fn run_zones(config: &AzoneConfig, command: ZoneCommands) -> AzoneResult<()> {
    let manager =
        AvailabilityZoneManager::new(&config.data_dir, &config.zones, &subnet_utils(config))?;

    match command {
        ZoneCommands::List { sort } => {
            let mut zones: Vec<&AvailabilityZone> = match sort {
                Some(SortKey::Subnet) => manager.zones_by_subnet(),
                _ => manager.get_zones().iter().collect(),
            };
            if sort == Some(SortKey::Name) {
                zones.sort_by(|a, b| a.name().cmp(b.name()));
            }

            println!("{:<16} {:<20} {}", "NAME", "SUBNET", "AVAILABLE");
            for zone in zones {
                println!(
                    "{:<16} {:<20} {}",
                    zone.name(),
                    zone.subnet().to_cidr(),
                    yes_no(zone.is_available())
                );
            }
        }
        ZoneCommands::Show { name } => {
            let zone = lookup(&manager, &name)?;
            let subnet = zone.subnet();
            println!("Name:       {}", zone.name());
            println!("Subnet:     {}", subnet.to_cidr());
            println!("Gateway:    {}", subnet.min_address());
            println!(
                "Usable:     {} - {} ({} addresses)",
                subnet.min_address(),
                subnet.max_address(),
                subnet.usable_address_count()
            );
            println!("Available:  {}", yes_no(zone.is_available()));
            if zone.name() == manager.get_default_zone_name() {
                println!("Default:    yes");
            }
            println!("Record:     {}", zone.file_path().display());
        }
        ZoneCommands::SetAvailable { name, available } => {
            let zone = lookup(&manager, &name)?;
            zone.set_available(available)?;
            info!("Zone {} availability set to {}", name, available);
            println!(
                "Zone {} is {}",
                zone.name(),
                if available { "available" } else { "unavailable" }
            );
        }
        ZoneCommands::Auto => {
            println!("{}", manager.get_automatic_zone_name()?);
        }
        ZoneCommands::Default => {
            println!("{}", manager.get_default_zone_name());
        }
    }

    Ok(())
}

fn lookup<'a>(manager: &'a AvailabilityZoneManager, name: &str) -> AzoneResult<&'a AvailabilityZone> {
    manager.get_zone(name).map_err(|e| {
        eprintln!("Valid zones are: {}", manager.zone_names().join(", "));
        e
    })
}

fn yes_no(value: bool) -> &'static str {
    if value {
        "yes"
    } else {
        "no"
    }
}
