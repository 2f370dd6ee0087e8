// tests/upgrade_workflow.rs

//! End-to-end upgrade tests against a simulated appliance.

mod common;

use common::{Appliance, IMAGE_NAME, local_image, local_image_named, sim_device, volume};
use std::time::Duration;
use tmos_upgrade::install::InstallSettings;
use tmos_upgrade::transfer::UPLOAD_CHUNK_SIZE;
use tmos_upgrade::{
    BootOptions, Clock, Error, NetworkDevice, PollPolicy, RebootTarget,
};

#[test]
fn test_full_upgrade_to_new_volume() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().install_polls = 3;
    appliance.borrow_mut().reboot_downtime = 4;
    let (_dir, image) = local_image(UPLOAD_CHUNK_SIZE * 2 + 4096);

    let mut device = sim_device(&appliance);
    device.upgrade(&image, "HD1.2").unwrap();

    let state = appliance.borrow();
    assert_eq!(state.content_ranges.len(), 3);
    assert_eq!(state.content_ranges[0], format!("0-{}/{}", UPLOAD_CHUNK_SIZE - 1, UPLOAD_CHUNK_SIZE * 2 + 4096));
    assert_eq!(state.files[IMAGE_NAME], std::fs::read(&image).unwrap());

    assert_eq!(state.installs.len(), 1);
    assert_eq!(state.installs[0].0, IMAGE_NAME);
    assert!(state.installs[0].2.create_volume);
    assert_eq!(state.reboots, vec![RebootTarget::Volume("HD1.2".to_string())]);

    let hd12 = state.volume("HD1.2").unwrap();
    assert!(hd12.active);
    assert_eq!(hd12.version, "15.1.0");
    assert_eq!(hd12.basebuild, "0.0.31");
    assert!(!state.volume("HD1.1").unwrap().active);

    // Four install polls at 20s, then five reboot probes at 5s
    assert_eq!(device.clock().now(), Duration::from_secs(4 * 20 + 5 * 5));
}

#[test]
fn test_upgrade_existing_volume_reports_boot_options() {
    let appliance = Appliance::standard();
    appliance
        .borrow_mut()
        .volumes
        .push(volume("HD1.2", "14.1.0", "0.0.1", "complete", false));
    let (_dir, image) = local_image(10_000);

    let mut device = sim_device(&appliance);
    assert_eq!(
        device.boot_options().unwrap(),
        BootOptions {
            active_volume: Some("HD1.1".to_string())
        }
    );

    device.upgrade(&image, "HD1.2").unwrap();
    assert!(!appliance.borrow().installs[0].2.create_volume);
    assert_eq!(
        device.boot_options().unwrap().active_volume.as_deref(),
        Some("HD1.2")
    );
}

#[test]
fn test_corrupted_upload_stops_before_install() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().corrupt_uploads = true;
    let (_dir, image) = local_image(50_000);

    let mut device = sim_device(&appliance);
    let err = device.upgrade(&image, "HD1.2").unwrap_err();

    match err {
        Error::IntegrityMismatch { expected, actual } => {
            assert_eq!(expected.len(), 32);
            assert_eq!(actual.len(), 32);
            assert_ne!(expected, actual);
        }
        other => panic!("expected IntegrityMismatch, got {other:?}"),
    }
    let state = appliance.borrow();
    assert!(state.installs.is_empty());
    assert!(state.reboots.is_empty());
}

#[test]
fn test_insufficient_space_stops_before_install() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().free_gb = 5.0;
    let (_dir, image) = local_image(1000);

    let mut device = sim_device(&appliance);
    let err = device.upgrade(&image, "HD1.2").unwrap_err();

    assert!(matches!(
        err,
        Error::InsufficientSpace { required, available } if required == 6.0 && available == 5.0
    ));
    assert!(appliance.borrow().installs.is_empty());
}

#[test]
fn test_free_space_exactly_minimum_is_enough() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().free_gb = 6.0;
    let (_dir, image) = local_image(1000);

    let mut device = sim_device(&appliance);
    device.upgrade(&image, "HD1.2").unwrap();
    assert_eq!(device.free_space().unwrap(), 6.0);
}

#[test]
fn test_install_timeout_skips_reboot() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().install_polls = 100;
    let (_dir, image) = local_image(1000);

    let settings = InstallSettings {
        min_free_space_gb: 6.0,
        policy: PollPolicy::new(Duration::from_secs(20), Duration::from_secs(120)),
    };
    let mut device = sim_device(&appliance).with_install_settings(settings);
    let err = device.upgrade(&image, "HD1.2").unwrap_err();

    assert!(matches!(
        err,
        Error::InstallTimeout { ref volume, timeout, .. }
            if volume == "HD1.2" && timeout == Duration::from_secs(120)
    ));
    assert!(appliance.borrow().reboots.is_empty());
    assert_eq!(device.clock().now(), Duration::from_secs(120));
}

#[test]
fn test_reboot_timeout_when_appliance_stays_down() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().reboot_downtime = 1000;
    let (_dir, image) = local_image(1000);

    let mut device = sim_device(&appliance);
    let err = device.upgrade(&image, "HD1.2").unwrap_err();

    assert!(matches!(err, Error::RebootTimeout { ref volume, .. } if volume == "HD1.2"));
    let state = appliance.borrow();
    assert_eq!(state.reboots.len(), 1);
    // One reconnect per 5s probe until the 600s deadline
    assert_eq!(state.reconnects, 120);
}

#[test]
fn test_upgrade_image_name_with_shell_characters() {
    let name = "BIGIP 15.1 'hf1' $(reboot).iso";
    let appliance = Appliance::standard();
    appliance
        .borrow_mut()
        .catalog
        .insert(name.to_string(), ("15.1.0".to_string(), "0.0.31".to_string()));
    let (_dir, image) = local_image_named(name, 2000);

    let mut device = sim_device(&appliance);
    assert!(!device.file_copy_remote_exists(&image, None).unwrap());
    device.upgrade(&image, "HD1.2").unwrap();

    let state = appliance.borrow();
    assert!(state.files.contains_key(name));
    assert_eq!(state.installs[0].0, name);
    assert!(state.volume("HD1.2").unwrap().active);
}

#[test]
fn test_missing_local_image() {
    let appliance = Appliance::standard();
    let dir = tempfile::tempdir().unwrap();
    let missing = dir.path().join(IMAGE_NAME);

    let mut device = sim_device(&appliance);
    assert!(matches!(
        device.upgrade(&missing, "HD1.2"),
        Err(Error::FileNotFound(_))
    ));
    assert!(appliance.borrow().content_ranges.is_empty());
}

#[test]
fn test_file_copy_and_remote_exists() {
    let appliance = Appliance::standard();
    let (_dir, image) = local_image(3000);
    let mut device = sim_device(&appliance);

    assert!(!device.file_copy_remote_exists(&image, None).unwrap());
    device.file_copy(&image, None).unwrap();
    assert!(device.file_copy_remote_exists(&image, None).unwrap());

    std::fs::write(&image, b"different content").unwrap();
    assert!(!device.file_copy_remote_exists(&image, None).unwrap());

    assert!(matches!(
        device.file_copy(&image, Some("/var/tmp")),
        Err(Error::NotSupported(_))
    ));
}

#[test]
fn test_set_boot_options_installs_uploaded_image() {
    let appliance = Appliance::standard();
    appliance.borrow_mut().install_polls = 1;
    let (_dir, image) = local_image(2048);
    let mut device = sim_device(&appliance);

    device.file_copy(&image, None).unwrap();
    device.set_boot_options(IMAGE_NAME, "HD1.3").unwrap();

    let state = appliance.borrow();
    let hd13 = state.volume("HD1.3").unwrap();
    assert_eq!(hd13.version, "15.1.0");
    assert_eq!(hd13.status, "complete");
    assert!(!hd13.active);
    assert!(state.reboots.is_empty());
}

#[test]
fn test_configuration_operations_not_supported() {
    let appliance = Appliance::standard();
    let mut device = sim_device(&appliance);

    assert!(matches!(device.show("show sys version", false), Err(Error::NotSupported(_))));
    assert!(matches!(device.config("modify sys global-settings"), Err(Error::NotSupported(_))));
    assert!(matches!(device.running_config(), Err(Error::NotSupported(_))));
    assert!(matches!(device.facts(), Err(Error::NotSupported(_))));
}
