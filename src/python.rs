//! Python bindings for the opstream disassembly engine

use pyo3::exceptions::PyValueError;
use pyo3::prelude::*;

use crate::arch::{ArchId, Endianness, MachineSubtype};
use crate::{Control, DisasmError, Session};

/// Callback return value that keeps the streaming loop going.
pub const DISASM_CONTINUE: i64 = 0;
/// Callback return value that stops the streaming loop.
pub const DISASM_STOP: i64 = 1;

fn to_py_err(e: DisasmError) -> PyErr {
    PyValueError::new_err(e.to_string())
}

/// Stateful disassembly session exposed to Python.
#[pyclass(name = "Session")]
struct PySession {
    inner: Session,
}

#[pymethods]
impl PySession {
    #[new]
    #[pyo3(signature = (arch=None, machine="default", endian="unknown"))]
    fn new(arch: Option<&str>, machine: &str, endian: &str) -> PyResult<Self> {
        let mut inner = Session::new();
        if let Some(arch) = arch {
            let arch: ArchId = arch.parse().map_err(PyValueError::new_err)?;
            let machine: MachineSubtype = machine.parse().map_err(PyValueError::new_err)?;
            let endian: Endianness = endian.parse().map_err(PyValueError::new_err)?;
            inner.bind_architecture(arch, machine, endian);
        }
        Ok(Self { inner })
    }

    /// Bind the architecture triple; decoder resolution is deferred to the
    /// next disassemble call.
    fn bind_architecture(&mut self, arch: &str, machine: &str, endian: &str) -> PyResult<()> {
        let arch: ArchId = arch.parse().map_err(PyValueError::new_err)?;
        let machine: MachineSubtype = machine.parse().map_err(PyValueError::new_err)?;
        let endian: Endianness = endian.parse().map_err(PyValueError::new_err)?;
        self.inner.bind_architecture(arch, machine, endian);
        Ok(())
    }

    /// Copy the input bytes and record their load address.
    #[pyo3(signature = (data, load_address=0))]
    fn set_input_buffer(&mut self, data: Vec<u8>, load_address: u64) {
        self.inner.set_input_buffer(&data, load_address);
    }

    /// Disassemble the whole buffer, returning a list of
    /// (address, size, delay_slots, type, target, target2, text) tuples.
    #[allow(clippy::type_complexity)]
    fn disassemble(&mut self) -> PyResult<Vec<(u64, usize, u8, u8, u64, u64, String)>> {
        let insns = self.inner.disassemble().map_err(to_py_err)?;
        Ok(insns
            .into_iter()
            .map(|i| {
                (
                    i.address,
                    i.size,
                    i.delay_slots,
                    i.insn_type as u8,
                    i.target,
                    i.target2,
                    i.text,
                )
            })
            .collect())
    }

    /// Stream instructions from `start_offset` into `callback`, which
    /// receives the same 7 fields as `disassemble` and returns
    /// DISASM_CONTINUE or DISASM_STOP. Returns the bytes consumed.
    #[pyo3(signature = (start_offset, callback))]
    fn disassemble_callback(
        &mut self,
        start_offset: usize,
        callback: Bound<'_, PyAny>,
    ) -> PyResult<usize> {
        let result = self.inner.disassemble_callback(start_offset, |insn| {
            let decision = callback
                .call1((
                    insn.address,
                    insn.size,
                    insn.delay_slots,
                    insn.insn_type as u8,
                    insn.target,
                    insn.target2,
                    insn.text.as_str(),
                ))
                .and_then(|r| r.extract::<i64>());

            match decision {
                Ok(v) if v == DISASM_CONTINUE => Ok(Control::Continue),
                Ok(_) => Ok(Control::Stop),
                Err(e) => Err(Box::new(e) as crate::CallbackError),
            }
        });

        match result {
            Ok(consumed) => Ok(consumed),
            // Restore the original Python exception when the callback raised
            Err(DisasmError::Callback(e)) => match e.downcast::<PyErr>() {
                Ok(py_err) => Err(*py_err),
                Err(other) => Err(PyValueError::new_err(other.to_string())),
            },
            Err(e) => Err(to_py_err(e)),
        }
    }

    #[getter]
    fn architecture(&self) -> String {
        self.inner.architecture().to_string()
    }

    #[getter]
    fn machine(&self) -> String {
        self.inner.machine().to_string()
    }

    #[getter]
    fn endian(&self) -> String {
        self.inner.endian().to_string()
    }

    #[getter]
    fn load_address(&self) -> u64 {
        self.inner.load_address()
    }
}

/// Python module initialization
#[pymodule]
fn opstream(m: &Bound<'_, PyModule>) -> PyResult<()> {
    m.add_class::<PySession>()?;
    m.add("DISASM_CONTINUE", DISASM_CONTINUE)?;
    m.add("DISASM_STOP", DISASM_STOP)?;
    Ok(())
}
