// Allocation accounting across the boundary: every construct/destroy pair,
// every owned return, and the value-replacement seam must net zero live
// allocations.
//
// Single #[test] on purpose: the harness runs tests on separate threads and
// concurrent allocations would perturb the counter.

use caravel_core::ffi::*;
use caravel_core::script::Script;
use std::alloc::{GlobalAlloc, Layout, System};
use std::ffi::CString;
use std::ptr;
use std::sync::atomic::{AtomicIsize, Ordering};

struct CountingAllocator;

static LIVE: AtomicIsize = AtomicIsize::new(0);

unsafe impl GlobalAlloc for CountingAllocator {
    unsafe fn alloc(&self, layout: Layout) -> *mut u8 {
        LIVE.fetch_add(1, Ordering::SeqCst);
        unsafe { System.alloc(layout) }
    }

    unsafe fn dealloc(&self, ptr: *mut u8, layout: Layout) {
        LIVE.fetch_sub(1, Ordering::SeqCst);
        unsafe { System.dealloc(ptr, layout) }
    }
}

#[global_allocator]
static ALLOC: CountingAllocator = CountingAllocator;

fn live() -> isize {
    LIVE.load(Ordering::SeqCst)
}

const P2SH_HEX: &str = "a91457d6b4ded38193013643b03b4472e15f80bc465787";

/// One pass over every allocating surface, releasing everything it takes.
fn exercise() {
    // Script handles plus both owned string forms and the byte buffer.
    let hex = CString::new(P2SH_HEX).unwrap();
    let mut script: *mut Script = ptr::null_mut();
    assert_eq!(
        cvl_script_from_hex(hex.as_ptr(), &mut script),
        cvl_status_t::CVL_OK
    );
    cvl_string_free(cvl_script_to_hex(script));
    cvl_string_free(cvl_script_asm(script));
    let mut buf = cvl_buf_t {
        ptr: ptr::null_mut(),
        len: 0,
    };
    assert_eq!(cvl_script_bytes(script, &mut buf), cvl_status_t::CVL_OK);
    cvl_bytes_free(buf);

    // Address derivation and both derived handles.
    let network = cvl_network_bitcoin();
    let address = cvl_address_from_script(script, network);
    assert!(!address.is_null());
    cvl_string_free(cvl_address_to_string(address));
    let rebuilt = cvl_address_script(address);
    cvl_script_free(rebuilt);
    let derived = cvl_address_network(address);
    cvl_string_free(cvl_network_to_string(derived));
    cvl_network_free(derived);
    cvl_address_free(address);
    cvl_network_free(network);
    cvl_script_free(script);

    // Wallet and builder, dispatching through a native selector record.
    let name = CString::new("leak probe").unwrap();
    let mut wallet = ptr::null_mut();
    assert_eq!(cvl_wallet_new(name.as_ptr(), &mut wallet), cvl_status_t::CVL_OK);
    cvl_wallet_add_utxo(wallet, 700);
    cvl_wallet_add_utxo(wallet, 300);
    let mut builder = ptr::null_mut();
    assert_eq!(cvl_tx_builder_new(wallet, &mut builder), cvl_status_t::CVL_OK);
    let mut selector = cvl_coin_selector_largest_first(10);
    cvl_tx_builder_set_selector(builder, &selector);
    cvl_tx_builder_set_target(builder, 800);
    assert_eq!(cvl_tx_builder_finish(builder), 1000);
    cvl_tx_builder_free(builder);
    cvl_wallet_free(wallet);
    cvl_coin_selector_destroy(&mut selector);

    // Stateless selector: nothing to release.
    let mut oldest = cvl_coin_selector_oldest_first();
    cvl_coin_selector_destroy(&mut oldest);

    // Utxo with its boxed value slot.
    let utxo = cvl_utxo_new(10, 42);
    cvl_utxo_free(utxo);
}

#[test]
fn boundary_frees_everything_it_allocates() {
    // Warm-up pass so one-time runtime allocations (thread locals, lazy
    // buffers) settle before the measured passes.
    exercise();

    let before = live();
    exercise();
    exercise();
    assert_eq!(
        live(),
        before,
        "net live allocations changed across full boundary passes"
    );

    // The replacement seam: each set releases the previous value slot, and
    // destroy releases the last one.
    let before = live();
    let utxo = cvl_utxo_new(10, 42);
    cvl_utxo_set_value(utxo, 50);
    cvl_utxo_set_value(utxo, 1000);
    assert_eq!(unsafe { *cvl_utxo_value(utxo) }, 1000);
    cvl_utxo_free(utxo);
    assert_eq!(
        live(),
        before,
        "value replacement must release the previous slot exactly once"
    );

    // A native selector's heap context is released by its destroy, not by
    // the builders that dispatched through copies of the record.
    let before = live();
    let mut selector = cvl_coin_selector_largest_first(0);
    cvl_coin_selector_destroy(&mut selector);
    assert_eq!(live(), before, "selector context must be released by destroy");
}
