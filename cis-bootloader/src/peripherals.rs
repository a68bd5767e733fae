// SPDX-License-Identifier: MIT
// Copyright (c) 2026 ADNT Sarl <info@adnt.io>

//! Peripheral initialization for the bootloader.

use fugit::RateExtU32;
use rp2040_hal as hal;
use rp2040_hal::Clock;
use rp2040_hal::gpio::{FunctionSpi, Pin};
use rp2040_hal::spi::Spi;

pub type LedPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio25, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;

pub type SdCsPin =
    hal::gpio::Pin<hal::gpio::bank0::Gpio17, hal::gpio::FunctionSioOutput, hal::gpio::PullDown>;

pub type SdSpi = Spi<hal::spi::Enabled, hal::pac::SPI0, (
    Pin<hal::gpio::bank0::Gpio19, FunctionSpi, hal::gpio::PullDown>,
    Pin<hal::gpio::bank0::Gpio16, FunctionSpi, hal::gpio::PullDown>,
    Pin<hal::gpio::bank0::Gpio18, FunctionSpi, hal::gpio::PullDown>,
)>;

pub struct Peripherals {
    pub led_pin: LedPin,
    /// Drives progress-bar delays and the `SdCard` driver's timeout logic.
    pub timer: hal::Timer,
    /// A second handle onto the same free-running timer, for the delay
    /// the SPI block device needs independently of the one the core's
    /// progress reporting uses.
    pub spi_delay: hal::Timer,
    pub sd_spi: SdSpi,
    pub sd_cs: SdCsPin,
    pub resets: hal::pac::RESETS,
}

pub fn init() -> Peripherals {
    let mut pac = unsafe { hal::pac::Peripherals::steal() };

    let mut watchdog = hal::Watchdog::new(pac.WATCHDOG);
    let clocks = hal::clocks::init_clocks_and_plls(
        12_000_000u32,
        pac.XOSC,
        pac.CLOCKS,
        pac.PLL_SYS,
        pac.PLL_USB,
        &mut pac.RESETS,
        &mut watchdog,
    )
    .unwrap();

    let timer = hal::Timer::new(pac.TIMER, &mut pac.RESETS, &clocks);
    // `Timer` is a thin, `Copy` handle onto the free-running TIMER
    // peripheral, so the SPI block device can hold its own delay source
    // without contending with the core's progress-reporting timer.
    let spi_delay = timer;
    let sio = hal::Sio::new(pac.SIO);
    let pins = hal::gpio::Pins::new(
        pac.IO_BANK0,
        pac.PADS_BANK0,
        sio.gpio_bank0,
        &mut pac.RESETS,
    );

    // SPI0 carries the removable mass-storage card the package file lives
    // on; its FAT layout and BlockDevice wiring live in `filesystem.rs`,
    // behind `cis_boot_core::ports::FileSystem`. Initialized at 400kHz
    // here, matching the SD card spec's power-up negotiation rate; the
    // card driver itself is free to renegotiate a faster clock once
    // initialized.
    let sclk: Pin<_, FunctionSpi, _> = pins.gpio18.into_function();
    let mosi: Pin<_, FunctionSpi, _> = pins.gpio19.into_function();
    let miso: Pin<_, FunctionSpi, _> = pins.gpio16.into_function();
    let sd_cs = pins.gpio17.into_push_pull_output();

    let sd_spi = Spi::new(pac.SPI0, (mosi, miso, sclk)).init(
        &mut pac.RESETS,
        clocks.peripheral_clock.freq(),
        400.kHz(),
        embedded_hal::spi::MODE_0,
    );

    Peripherals {
        led_pin: pins.gpio25.into_push_pull_output(),
        timer,
        spi_delay,
        sd_spi,
        sd_cs,
        resets: pac.RESETS,
    }
}
