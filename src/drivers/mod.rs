/*
 * Device Drivers
 *
 * Hardware-facing drivers. For now only the serial transport that backs
 * the console descriptors.
 */

pub mod serial;
