#![allow(clippy::not_unsafe_ptr_arg_deref)]

// The C boundary. Everything here is flat data: opaque handles over boxed
// values, (ptr, len) buffers, NUL-terminated strings, and one
// function-pointer record per core-defined capability.
//
// Conventions, fixed per function and never mixed:
// - fallible constructors return cvl_status_t and write the out-parameter
//   only on CVL_OK; on failure it stays null;
// - queries that may legitimately have no answer return the null sentinel
//   directly, with no status channel;
// - every returned string or byte buffer is a fresh allocation owned by the
//   caller and released through the matching cvl_*_free, except where a
//   method documents static never-freed data;
// - destroy calls are null-tolerant; double-destroy and use-after-destroy
//   are caller contract violations and are not tracked.

use crate::address::Address;
use crate::network::Network;
use crate::script::Script;
use crate::wallet::{CoinSelection, LargestFirst, LocalUtxo, OldestFirst, TxBuilder, Wallet};
use std::cell::RefCell;
use std::ffi::{CStr, CString, c_void};
use std::os::raw::c_char;
use std::str::FromStr;

#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, PartialEq, Eq, Debug)]
pub enum cvl_status_t {
    CVL_OK = 0,
    CVL_ERR_NULL_ARG = 1,
    CVL_ERR_INVALID_UTF8 = 2,
    CVL_ERR_INVALID_HEX = 3,
    CVL_ERR_UNKNOWN_NETWORK = 4,
    CVL_ERR_MALFORMED_ADDRESS = 5,
}

/// Owned byte buffer. Ownership, including the allocation, transfers to the
/// receiver; release through cvl_bytes_free.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug)]
pub struct cvl_buf_t {
    pub ptr: *mut u8,
    pub len: usize,
}

/// Coin-selection capability as a flat vtable record. `ctx` is passed as the
/// first argument of every method, mirroring `&self`.
///
/// Ownership: building the record registers nothing; passing it to a
/// consumer copies the record and does NOT transfer ownership of `ctx`. The
/// only path that runs `destroy` is cvl_coin_selector_destroy. A null
/// `destroy` means no cleanup is required. `select` receives `utxos` as a
/// borrowed view valid only for the call. `name` returns static data that is
/// never freed by either side.
#[repr(C)]
#[allow(non_camel_case_types)]
#[derive(Clone, Copy, Debug)]
pub struct cvl_coin_selector_t {
    pub ctx: *mut c_void,
    pub select: Option<unsafe extern "C" fn(*const c_void, *const u64, usize, u64) -> u64>,
    pub name: Option<unsafe extern "C" fn(*const c_void) -> *const c_char>,
    pub destroy: Option<unsafe extern "C" fn(*mut c_void)>,
}

thread_local! {
    static LAST_ERROR: RefCell<String> = const { RefCell::new(String::new()) };
}

fn set_last_error(msg: impl Into<String>) {
    LAST_ERROR.with(|e| {
        *e.borrow_mut() = msg.into();
    });
}

/// Copies the last error message for this thread into `buf` (NUL-terminated,
/// truncated to `buf_len`); returns the full message length.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_last_error(buf: *mut u8, buf_len: usize) -> usize {
    let msg = LAST_ERROR.with(|e| e.borrow().clone());
    let bytes = msg.as_bytes();
    let copy_len = bytes.len().min(buf_len.saturating_sub(1));
    if !buf.is_null() && buf_len > 0 {
        unsafe {
            std::ptr::copy_nonoverlapping(bytes.as_ptr(), buf, copy_len);
            *buf.add(copy_len) = 0;
        }
    }
    bytes.len()
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_abi_version() -> u32 {
    crate::ABI_VERSION
}

fn cstr_to_str<'a>(ptr: *const c_char) -> Result<&'a str, cvl_status_t> {
    if ptr.is_null() {
        set_last_error("null string argument");
        return Err(cvl_status_t::CVL_ERR_NULL_ARG);
    }
    unsafe { CStr::from_ptr(ptr) }.to_str().map_err(|_| {
        set_last_error("string argument is not valid utf-8");
        cvl_status_t::CVL_ERR_INVALID_UTF8
    })
}

fn string_out(s: String) -> *mut c_char {
    match CString::new(s) {
        Ok(c) => c.into_raw(),
        Err(_) => {
            set_last_error("interior NUL in outgoing string");
            std::ptr::null_mut()
        }
    }
}

fn bytes_out(v: Vec<u8>) -> cvl_buf_t {
    let boxed = v.into_boxed_slice();
    let len = boxed.len();
    let ptr = Box::into_raw(boxed) as *mut u8;
    cvl_buf_t { ptr, len }
}

// ----------------
// Generic releases
// ----------------

#[unsafe(no_mangle)]
pub extern "C" fn cvl_string_free(s: *mut c_char) {
    if !s.is_null() {
        unsafe {
            drop(CString::from_raw(s));
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_bytes_free(buf: cvl_buf_t) {
    if buf.ptr.is_null() {
        return;
    }
    unsafe {
        let slice = std::ptr::slice_from_raw_parts_mut(buf.ptr, buf.len);
        drop(Box::from_raw(slice));
    }
}

// ----------------
// Script
// ----------------

#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_new(
    bytes: *const u8,
    len: usize,
    out: *mut *mut Script,
) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    // Null bytes with len == 0 is the empty script.
    let raw = if len == 0 {
        Vec::new()
    } else {
        if bytes.is_null() {
            set_last_error("bytes is null with nonzero length");
            return cvl_status_t::CVL_ERR_NULL_ARG;
        }
        unsafe { std::slice::from_raw_parts(bytes, len) }.to_vec()
    };
    unsafe {
        *out = Box::into_raw(Box::new(Script::new(raw)));
    }
    cvl_status_t::CVL_OK
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_from_hex(hex: *const c_char, out: *mut *mut Script) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    let text = match cstr_to_str(hex) {
        Ok(s) => s,
        Err(status) => return status,
    };
    match Script::from_hex(text) {
        Ok(script) => {
            unsafe {
                *out = Box::into_raw(Box::new(script));
            }
            cvl_status_t::CVL_OK
        }
        Err(e) => {
            set_last_error(format!("{}", e));
            cvl_status_t::CVL_ERR_INVALID_HEX
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_to_hex(script: *const Script) -> *mut c_char {
    if script.is_null() {
        return std::ptr::null_mut();
    }
    string_out(unsafe { &*script }.to_hex())
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_asm(script: *const Script) -> *mut c_char {
    if script.is_null() {
        return std::ptr::null_mut();
    }
    string_out(unsafe { &*script }.asm())
}

/// Copies the raw script bytes into a fresh caller-owned buffer.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_bytes(script: *const Script, out: *mut cvl_buf_t) -> cvl_status_t {
    if script.is_null() || out.is_null() {
        set_last_error("script or out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    let buf = bytes_out(unsafe { &*script }.as_bytes().to_vec());
    unsafe {
        *out = buf;
    }
    cvl_status_t::CVL_OK
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_script_free(script: *mut Script) {
    if !script.is_null() {
        unsafe {
            drop(Box::from_raw(script));
        }
    }
}

// ----------------
// Network
// ----------------

#[unsafe(no_mangle)]
pub extern "C" fn cvl_network_from_string(
    s: *const c_char,
    out: *mut *mut Network,
) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    let text = match cstr_to_str(s) {
        Ok(s) => s,
        Err(status) => return status,
    };
    match Network::from_str(text) {
        Ok(network) => {
            unsafe {
                *out = Box::into_raw(Box::new(network));
            }
            cvl_status_t::CVL_OK
        }
        Err(e) => {
            set_last_error(format!("{}", e));
            cvl_status_t::CVL_ERR_UNKNOWN_NETWORK
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_network_bitcoin() -> *mut Network {
    Box::into_raw(Box::new(Network::Bitcoin))
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_network_testnet() -> *mut Network {
    Box::into_raw(Box::new(Network::Testnet))
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_network_to_string(network: *const Network) -> *mut c_char {
    if network.is_null() {
        return std::ptr::null_mut();
    }
    string_out(unsafe { &*network }.to_string())
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_network_free(network: *mut Network) {
    if !network.is_null() {
        unsafe {
            drop(Box::from_raw(network));
        }
    }
}

// ----------------
// Address
// ----------------

/// Sentinel convention: null means "this script has no address form"; that
/// is not an error and sets no status.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_from_script(
    script: *const Script,
    network: *const Network,
) -> *mut Address {
    if script.is_null() || network.is_null() {
        return std::ptr::null_mut();
    }
    let (script, network) = unsafe { (&*script, *network) };
    match Address::from_script(script, network) {
        Some(addr) => Box::into_raw(Box::new(addr)),
        None => std::ptr::null_mut(),
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_from_string(
    s: *const c_char,
    out: *mut *mut Address,
) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    let text = match cstr_to_str(s) {
        Ok(s) => s,
        Err(status) => return status,
    };
    match Address::from_str(text) {
        Ok(addr) => {
            unsafe {
                *out = Box::into_raw(Box::new(addr));
            }
            cvl_status_t::CVL_OK
        }
        Err(e) => {
            set_last_error(format!("{}", e));
            cvl_status_t::CVL_ERR_MALFORMED_ADDRESS
        }
    }
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_to_string(address: *const Address) -> *mut c_char {
    if address.is_null() {
        return std::ptr::null_mut();
    }
    string_out(unsafe { &*address }.to_string())
}

/// Rebuilds the canonical script; the returned handle is a new allocation
/// owned by the caller.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_script(address: *const Address) -> *mut Script {
    if address.is_null() {
        return std::ptr::null_mut();
    }
    Box::into_raw(Box::new(unsafe { &*address }.script_pubkey()))
}

/// The returned handle is a new allocation owned by the caller.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_network(address: *const Address) -> *mut Network {
    if address.is_null() {
        return std::ptr::null_mut();
    }
    Box::into_raw(Box::new(unsafe { &*address }.network))
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_address_free(address: *mut Address) {
    if !address.is_null() {
        unsafe {
            drop(Box::from_raw(address));
        }
    }
}

// ----------------
// Utxo
// ----------------

#[unsafe(no_mangle)]
pub extern "C" fn cvl_utxo_new(value: u64, keychain: u32) -> *mut LocalUtxo {
    Box::into_raw(Box::new(LocalUtxo::new(value, keychain)))
}

/// Borrowed, aliased access to the value slot. Mutation through the pointer
/// is immediately visible through the handle. The pointer must not outlive
/// the handle and is invalidated by cvl_utxo_set_value.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_utxo_value(utxo: *mut LocalUtxo) -> *mut u64 {
    if utxo.is_null() {
        return std::ptr::null_mut();
    }
    unsafe { &mut *utxo }.value_mut() as *mut u64
}

/// Replaces the value slot; the previous allocation is released here,
/// exactly once.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_utxo_set_value(utxo: *mut LocalUtxo, value: u64) {
    if utxo.is_null() {
        return;
    }
    unsafe { &mut *utxo }.replace_value(value);
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_utxo_keychain(utxo: *const LocalUtxo) -> u32 {
    if utxo.is_null() {
        return 0;
    }
    unsafe { &*utxo }.keychain()
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_utxo_free(utxo: *mut LocalUtxo) {
    if !utxo.is_null() {
        unsafe {
            drop(Box::from_raw(utxo));
        }
    }
}

// ----------------
// Wallet
// ----------------

#[unsafe(no_mangle)]
pub extern "C" fn cvl_wallet_new(name: *const c_char, out: *mut *mut Wallet) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    let name = match cstr_to_str(name) {
        Ok(s) => s,
        Err(status) => return status,
    };
    unsafe {
        *out = Box::into_raw(Box::new(Wallet::new(name)));
    }
    cvl_status_t::CVL_OK
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_wallet_add_utxo(wallet: *mut Wallet, value: u64) {
    if wallet.is_null() {
        return;
    }
    unsafe { &mut *wallet }.add_utxo(value);
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_wallet_utxo_count(wallet: *const Wallet) -> usize {
    if wallet.is_null() {
        return 0;
    }
    unsafe { &*wallet }.utxo_count()
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_wallet_free(wallet: *mut Wallet) {
    if !wallet.is_null() {
        unsafe {
            drop(Box::from_raw(wallet));
        }
    }
}

// ----------------
// Transaction builder
// ----------------

/// Derived constructor: snapshots the wallet's candidates. The builder does
/// not borrow the wallet; either may be destroyed first.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_new(
    wallet: *const Wallet,
    out: *mut *mut TxBuilder,
) -> cvl_status_t {
    if out.is_null() {
        set_last_error("out is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = std::ptr::null_mut();
    }
    if wallet.is_null() {
        set_last_error("wallet is null");
        return cvl_status_t::CVL_ERR_NULL_ARG;
    }
    unsafe {
        *out = Box::into_raw(Box::new(TxBuilder::new(&*wallet)));
    }
    cvl_status_t::CVL_OK
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_enable_rbf(builder: *mut TxBuilder) {
    if builder.is_null() {
        return;
    }
    unsafe { &mut *builder }.enable_rbf();
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_disable_rbf(builder: *mut TxBuilder) {
    if builder.is_null() {
        return;
    }
    unsafe { &mut *builder }.disable_rbf();
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_set_target(builder: *mut TxBuilder, target: u64) {
    if builder.is_null() {
        return;
    }
    unsafe { &mut *builder }.set_target(target);
}

/// Registers a selector with the builder. The record is copied; ownership of
/// `ctx` stays with whoever built the record, and its destructor is never
/// invoked through the builder. The caller must keep `ctx` alive for as long
/// as the builder can dispatch to it.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_set_selector(
    builder: *mut TxBuilder,
    selector: *const cvl_coin_selector_t,
) {
    if builder.is_null() || selector.is_null() {
        return;
    }
    let record = unsafe { *selector };
    unsafe { &mut *builder }.set_selector(Box::new(BridgedSelector { vt: record }));
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_finish(builder: *const TxBuilder) -> u64 {
    if builder.is_null() {
        return 0;
    }
    unsafe { &*builder }.finish()
}

#[unsafe(no_mangle)]
pub extern "C" fn cvl_tx_builder_free(builder: *mut TxBuilder) {
    if !builder.is_null() {
        unsafe {
            drop(Box::from_raw(builder));
        }
    }
}

// ----------------
// Coin-selector bridge
// ----------------

/// A vtable record adapted back into the trait. Holds a copy of the record
/// only; `ctx` stays owned by whoever built it.
#[derive(Debug, Clone, Copy)]
struct BridgedSelector {
    vt: cvl_coin_selector_t,
}

impl CoinSelection for BridgedSelector {
    fn select(&self, utxos: &[u64], target: u64) -> u64 {
        match self.vt.select {
            Some(f) => unsafe {
                f(
                    self.vt.ctx as *const c_void,
                    utxos.as_ptr(),
                    utxos.len(),
                    target,
                )
            },
            None => 0,
        }
    }

    fn name(&self) -> &'static str {
        let Some(f) = self.vt.name else {
            return "foreign";
        };
        let ptr = unsafe { f(self.vt.ctx as *const c_void) };
        if ptr.is_null() {
            return "foreign";
        }
        // Contract: name returns static data.
        unsafe { CStr::from_ptr(ptr) }.to_str().unwrap_or("foreign")
    }
}

unsafe extern "C" fn largest_first_select(
    ctx: *const c_void,
    utxos: *const u64,
    utxos_len: usize,
    target: u64,
) -> u64 {
    if ctx.is_null() {
        return 0;
    }
    let strategy = unsafe { &*(ctx as *const LargestFirst) };
    let view = if utxos.is_null() {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(utxos, utxos_len) }
    };
    strategy.select(view, target)
}

unsafe extern "C" fn largest_first_name(_ctx: *const c_void) -> *const c_char {
    c"largest_first".as_ptr()
}

unsafe extern "C" fn oldest_first_select(
    _ctx: *const c_void,
    utxos: *const u64,
    utxos_len: usize,
    target: u64,
) -> u64 {
    let view = if utxos.is_null() {
        &[][..]
    } else {
        unsafe { std::slice::from_raw_parts(utxos, utxos_len) }
    };
    OldestFirst.select(view, target)
}

unsafe extern "C" fn oldest_first_name(_ctx: *const c_void) -> *const c_char {
    c"oldest_first".as_ptr()
}

unsafe extern "C" fn drop_ctx<T>(ctx: *mut c_void) {
    if !ctx.is_null() {
        unsafe {
            drop(Box::from_raw(ctx as *mut T));
        }
    }
}

/// Native-default selector wrapping the core's LargestFirst strategy. The
/// record owns a heap context; release it with cvl_coin_selector_destroy.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_coin_selector_largest_first(dust_floor: u64) -> cvl_coin_selector_t {
    let ctx = Box::into_raw(Box::new(LargestFirst { dust_floor }));
    cvl_coin_selector_t {
        ctx: ctx as *mut c_void,
        select: Some(largest_first_select),
        name: Some(largest_first_name),
        destroy: Some(drop_ctx::<LargestFirst>),
    }
}

/// Native-default selector wrapping the stateless OldestFirst strategy: the
/// context is null and no cleanup is required.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_coin_selector_oldest_first() -> cvl_coin_selector_t {
    cvl_coin_selector_t {
        ctx: std::ptr::null_mut(),
        select: Some(oldest_first_select),
        name: Some(oldest_first_name),
        destroy: None,
    }
}

/// Dispatches the record's name method. The returned string is static data
/// and is never freed; null when the record has no name method.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_coin_selector_name(selector: *const cvl_coin_selector_t) -> *const c_char {
    if selector.is_null() {
        return std::ptr::null();
    }
    let record = unsafe { &*selector };
    match record.name {
        Some(f) => unsafe { f(record.ctx as *const c_void) },
        None => std::ptr::null(),
    }
}

/// Runs the record's destructor on its context. A null destructor means no
/// cleanup is required and this is a safe no-op. Calling it twice on a
/// record whose destructor frees state is a caller contract violation.
#[unsafe(no_mangle)]
pub extern "C" fn cvl_coin_selector_destroy(selector: *mut cvl_coin_selector_t) {
    if selector.is_null() {
        return;
    }
    let record = unsafe { &*selector };
    if let Some(f) = record.destroy {
        unsafe {
            f(record.ctx);
        }
    }
}
