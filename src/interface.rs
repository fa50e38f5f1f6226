//! Bus transaction layer for the MPU-3050 cluster
//!
//! The gyroscope and its slave sensors share one I2C adapter. [`Bus`] owns that
//! adapter and exposes the four primitives every other module is built on:
//! single-register read/write and burst read/write. There is no retry logic;
//! a failed transaction returns the adapter's error verbatim.
//!
//! [`GyroInterface`] borrows the bus for a single gyroscope access and implements
//! the `device-driver` register interface so the typed register map in
//! [`crate::registers`] can be used on top of it.

use device_driver::RegisterInterface;
use embedded_hal::i2c::I2c;

/// Largest payload sent in a single burst transaction
///
/// Longer bursts are split into consecutive transactions addressed to the same
/// start register, which is what the FIFO and memory ports expect.
pub const MAX_BURST_LEN: usize = 32;

/// Shared I2C bus used by the gyroscope and all slaves
pub struct Bus<I2C> {
    i2c: I2C,
}

impl<I2C> Bus<I2C> {
    /// Wrap an I2C peripheral
    pub const fn new(i2c: I2C) -> Self {
        Self { i2c }
    }

    /// Consume the bus and return the I2C peripheral
    pub fn release(self) -> I2C {
        self.i2c
    }
}

impl<I2C> Bus<I2C>
where
    I2C: I2c,
{
    /// Read `buffer.len()` consecutive registers starting at `register`
    ///
    /// # Errors
    ///
    /// Returns the adapter error if the transaction fails.
    pub fn read(&mut self, address: u8, register: u8, buffer: &mut [u8]) -> Result<(), I2C::Error> {
        self.i2c.write_read(address, &[register], buffer)
    }

    /// Read a single register
    ///
    /// # Errors
    ///
    /// Returns the adapter error if the transaction fails.
    pub fn read_register(&mut self, address: u8, register: u8) -> Result<u8, I2C::Error> {
        let mut value = [0u8; 1];
        self.read(address, register, &mut value)?;
        Ok(value[0])
    }

    /// Write a single register
    ///
    /// # Errors
    ///
    /// Returns the adapter error if the transaction fails.
    pub fn write(&mut self, address: u8, register: u8, value: u8) -> Result<(), I2C::Error> {
        self.i2c.write(address, &[register, value])
    }

    /// Write `data` starting at `register`
    ///
    /// Payloads longer than [`MAX_BURST_LEN`] are sent as several transactions,
    /// each addressed to `register`.
    ///
    /// # Errors
    ///
    /// Returns the adapter error of the first failing transaction. Chunks sent
    /// before the failure are not rolled back.
    pub fn write_burst(&mut self, address: u8, register: u8, data: &[u8]) -> Result<(), I2C::Error> {
        let mut buffer = [0u8; MAX_BURST_LEN + 1];
        buffer[0] = register;

        for chunk in data.chunks(MAX_BURST_LEN) {
            buffer[1..=chunk.len()].copy_from_slice(chunk);
            self.i2c.write(address, &buffer[..=chunk.len()])?;
        }

        Ok(())
    }

    /// Drain `buffer.len()` bytes from a port register (FIFO or memory window)
    ///
    /// # Errors
    ///
    /// Returns the adapter error of the first failing transaction.
    pub fn read_burst(
        &mut self,
        address: u8,
        register: u8,
        buffer: &mut [u8],
    ) -> Result<(), I2C::Error> {
        for chunk in buffer.chunks_mut(MAX_BURST_LEN) {
            self.i2c.write_read(address, &[register], chunk)?;
        }
        Ok(())
    }
}

/// Register interface for the gyroscope, borrowing the shared bus
pub struct GyroInterface<'a, I2C> {
    bus: &'a mut Bus<I2C>,
    address: u8,
}

impl<'a, I2C> GyroInterface<'a, I2C> {
    /// Address the gyroscope at `address` through `bus`
    pub fn new(bus: &'a mut Bus<I2C>, address: u8) -> Self {
        Self { bus, address }
    }
}

impl<I2C> RegisterInterface for GyroInterface<'_, I2C>
where
    I2C: I2c,
{
    type Error = I2C::Error;
    type AddressType = u8;

    fn read_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        read_data: &mut [u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in read_data.len() for I2C
        self.bus.read(self.address, address, read_data)
    }

    fn write_register(
        &mut self,
        address: Self::AddressType,
        size_bits: u32,
        write_data: &[u8],
    ) -> Result<(), Self::Error> {
        let _ = size_bits; // Size is implicit in write_data.len() for I2C
        self.bus.write_burst(self.address, address, write_data)
    }
}
